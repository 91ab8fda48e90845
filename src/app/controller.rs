use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use gtk4::{glib, Application};
use image::RgbaImage;

use crate::bus::RemoteCommand;
use crate::capture::{CaptureError, CaptureSource};
use crate::clipboard::ClipboardBackend;
use crate::notification;
use crate::storage::StorageService;
use crate::upload::{Capture, FtpConfig, IMAGE_COPIED};

use super::upload_window::open_upload_window;
use super::worker::spawn_worker_action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CaptureMode {
    Full,
    Graphic,
}

/// A remote command translated into what the primary instance will do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CaptureRequest {
    pub(crate) mode: CaptureMode,
    pub(crate) target_dir: Option<PathBuf>,
    pub(crate) to_clipboard: bool,
    pub(crate) delay: Duration,
}

impl From<RemoteCommand> for CaptureRequest {
    fn from(command: RemoteCommand) -> Self {
        let (mode, path, to_clipboard, delay) = match command {
            RemoteCommand::FullScreen {
                path,
                to_clipboard,
                delay,
            } => (CaptureMode::Full, path, to_clipboard, delay),
            RemoteCommand::GraphicCapture { path, delay } => {
                (CaptureMode::Graphic, path, false, delay)
            }
        };
        Self {
            mode,
            target_dir: (!path.is_empty()).then(|| PathBuf::from(path)),
            to_clipboard,
            delay: Duration::from_millis(u64::try_from(delay).unwrap_or(0)),
        }
    }
}

/// Side effects to perform once the image is in hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CapturePlan {
    /// `Some(None)` saves into the default directory.
    pub(crate) save: Option<Option<PathBuf>>,
    pub(crate) copy_to_clipboard: bool,
    pub(crate) offer_upload: bool,
}

impl CaptureRequest {
    /// A file is written when a path was given or the clipboard was not
    /// requested; `--clipboard` with `--path` does both.
    pub(crate) fn plan(&self, upload_configured: bool) -> CapturePlan {
        let save = match (&self.target_dir, self.to_clipboard) {
            (Some(dir), _) => Some(Some(dir.clone())),
            (None, false) => Some(None),
            (None, true) => None,
        };
        CapturePlan {
            save,
            copy_to_clipboard: self.to_clipboard,
            offer_upload: self.mode == CaptureMode::Graphic && upload_configured,
        }
    }
}

/// Receives forwarded commands on the main loop and drives each capture.
pub(crate) struct Controller {
    application: Application,
    storage: StorageService,
    ftp: Option<FtpConfig>,
    source: Arc<dyn CaptureSource>,
    clipboard: Rc<dyn ClipboardBackend>,
}

impl Controller {
    pub(crate) fn new(
        application: Application,
        storage: StorageService,
        ftp: Option<FtpConfig>,
        source: Arc<dyn CaptureSource>,
        clipboard: Rc<dyn ClipboardBackend>,
    ) -> Self {
        Self {
            application,
            storage,
            ftp,
            source,
            clipboard,
        }
    }

    pub(crate) fn handle(self: &Rc<Self>, command: RemoteCommand) {
        let request = CaptureRequest::from(command);
        tracing::info!(
            mode = ?request.mode,
            delay_ms = request.delay.as_millis() as u64,
            "scheduling capture"
        );
        let controller = self.clone();
        glib::timeout_add_local_once(request.delay, move || controller.capture(request));
    }

    fn capture(self: &Rc<Self>, request: CaptureRequest) {
        let source = self.source.clone();
        let mode = request.mode;
        let controller = self.clone();
        spawn_worker_action(
            move || match mode {
                CaptureMode::Full => source.capture_full(),
                CaptureMode::Graphic => source.capture_region(),
            },
            move |result| match result {
                Some(Ok(image)) => controller.finish(&request, image),
                Some(Err(err)) => report_capture_failure(&err),
                None => tracing::warn!("capture worker stopped without a result"),
            },
        );
    }

    fn finish(&self, request: &CaptureRequest, image: RgbaImage) {
        let capture = Capture::new(image);
        let plan = request.plan(self.ftp.is_some());
        tracing::debug!(?plan, "capture acquired");

        if plan.save.is_some() || plan.copy_to_clipboard {
            let png = match capture.encode_png() {
                Ok(png) => png,
                Err(err) => {
                    tracing::error!(%err, "failed to encode capture");
                    notification::send("Capture failed", err.to_string());
                    return;
                }
            };
            if let Some(target_dir) = &plan.save {
                match self.storage.save_png(target_dir.as_deref(), &png) {
                    Ok(path) => notification::send("Capture saved", path.display().to_string()),
                    Err(err) => {
                        tracing::error!(%err, "failed to save capture");
                        notification::send("Capture not saved", err.to_string());
                    }
                }
            }
            if plan.copy_to_clipboard {
                match self.clipboard.set_png(&png) {
                    Ok(()) => notification::send("Capture copied", IMAGE_COPIED),
                    Err(err) => {
                        tracing::error!(%err, "failed to copy capture to clipboard");
                        notification::send("Clipboard unavailable", err.to_string());
                    }
                }
            }
        }

        if plan.offer_upload {
            if let Some(ftp) = &self.ftp {
                open_upload_window(&self.application, capture, ftp, self.clipboard.clone());
            }
        }
    }
}

fn report_capture_failure(err: &CaptureError) {
    tracing::error!(%err, "capture failed");
    notification::send("Capture failed", err.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_screen_command_maps_to_full_request() {
        let request = CaptureRequest::from(RemoteCommand::FullScreen {
            path: "/tmp".to_string(),
            to_clipboard: true,
            delay: 500,
        });
        assert_eq!(
            request,
            CaptureRequest {
                mode: CaptureMode::Full,
                target_dir: Some(PathBuf::from("/tmp")),
                to_clipboard: true,
                delay: Duration::from_millis(500),
            }
        );
    }

    #[test]
    fn empty_path_and_negative_delay_fall_back_to_defaults() {
        let request = CaptureRequest::from(RemoteCommand::GraphicCapture {
            path: String::new(),
            delay: -20,
        });
        assert_eq!(request.mode, CaptureMode::Graphic);
        assert!(request.target_dir.is_none());
        assert_eq!(request.delay, Duration::ZERO);
    }

    #[test]
    fn plan_without_flags_saves_to_default_directory() {
        let request = CaptureRequest::from(RemoteCommand::FullScreen {
            path: String::new(),
            to_clipboard: false,
            delay: 0,
        });
        let plan = request.plan(true);
        assert_eq!(plan.save, Some(None));
        assert!(!plan.copy_to_clipboard);
        assert!(!plan.offer_upload);
    }

    #[test]
    fn plan_clipboard_only_skips_file() {
        let request = CaptureRequest::from(RemoteCommand::FullScreen {
            path: String::new(),
            to_clipboard: true,
            delay: 0,
        });
        let plan = request.plan(false);
        assert_eq!(plan.save, None);
        assert!(plan.copy_to_clipboard);
    }

    #[test]
    fn plan_clipboard_with_path_does_both() {
        let request = CaptureRequest::from(RemoteCommand::FullScreen {
            path: "/srv/shots".to_string(),
            to_clipboard: true,
            delay: 0,
        });
        let plan = request.plan(false);
        assert_eq!(plan.save, Some(Some(PathBuf::from("/srv/shots"))));
        assert!(plan.copy_to_clipboard);
    }

    #[test]
    fn graphic_capture_offers_upload_only_when_configured() {
        let request = CaptureRequest::from(RemoteCommand::GraphicCapture {
            path: String::new(),
            delay: 0,
        });
        assert!(request.plan(true).offer_upload);
        assert!(!request.plan(false).offer_upload);
    }
}
