//! Upload of one capture to an FTP server and the presentation states that
//! follow it.
//!
//! [`BusyUpload::submit`] seals the one [`TransferRequest`] of a capture
//! inside a [`PendingTransfer`] whose `run` consumes it, and
//! [`BusyUpload::complete`] consumes the busy state, so each capture is
//! stored at most once and completes at most once. Result-only actions live on
//! [`UploadedCapture`], which exists only after a successful transfer.

use std::fmt;
use std::io::Cursor;
use std::rc::Rc;
use std::sync::Arc;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbaImage};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

use crate::clipboard::{ClipboardBackend, ClipboardResult};

mod ftp;

pub use ftp::FtpTransfer;

pub const UPLOAD_STATUS: &str = "Uploading Image to FTP";
pub const URL_COPIED: &str = "URL copied to clipboard.";
pub const IMAGE_COPIED: &str = "Screenshot copied to clipboard.";
pub const OPEN_FAILED: &str = "Unable to open the URL.";

const FILE_NAME_TOKEN_LEN: usize = 16;
const FILE_EXTENSION: &str = ".png";
const DRAG_ICON_SIZE: u32 = 256;
const DEFAULT_FTP_PORT: u16 = 21;
const ANONYMOUS_LOGIN: &str = "anonymous";

/// FTP target and public site, read from the `ftp` section of `config.json`.
#[derive(Clone, Default, Deserialize)]
pub struct FtpConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_ftp_port")]
    pub port: u16,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub remote_dir: String,
    /// Public base address; the uploaded file name is appended verbatim.
    #[serde(default)]
    pub site: String,
    /// Start the transfer as soon as the window opens instead of waiting for
    /// the Upload button.
    #[serde(default)]
    pub auto_upload: bool,
}

fn default_ftp_port() -> u16 {
    DEFAULT_FTP_PORT
}

impl fmt::Debug for FtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("login", &self.login)
            .field("remote_dir", &self.remote_dir)
            .field("site", &self.site)
            .field("auto_upload", &self.auto_upload)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct FtpEndpoint {
    pub host: String,
    pub port: u16,
    pub login: String,
    pub password: String,
    pub remote_dir: String,
}

impl FtpEndpoint {
    fn from_config(config: &FtpConfig) -> Self {
        let login = if config.login.is_empty() {
            ANONYMOUS_LOGIN.to_string()
        } else {
            config.login.clone()
        };
        Self {
            host: config.host.clone(),
            port: config.port,
            login,
            password: config.password.clone(),
            remote_dir: config.remote_dir.clone(),
        }
    }
}

impl fmt::Debug for FtpEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("login", &self.login)
            .field("remote_dir", &self.remote_dir)
            .finish_non_exhaustive()
    }
}

/// Everything one store attempt needs. Only built by [`BusyUpload::submit`].
#[derive(Debug)]
pub struct TransferRequest {
    endpoint: FtpEndpoint,
    file_name: String,
    payload: Arc<[u8]>,
}

impl TransferRequest {
    pub fn endpoint(&self) -> &FtpEndpoint {
        &self.endpoint
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// The single store of one submission, ready to move onto a worker thread.
#[derive(Debug)]
pub struct PendingTransfer<T> {
    transfer: T,
    request: TransferRequest,
}

impl<T: Transfer> PendingTransfer<T> {
    pub fn run(self) -> Result<(), TransferError> {
        self.transfer.store(&self.request)
    }
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("{0}")]
    Ftp(#[from] suppaftp::FtpError),
    #[error("upload worker stopped before reporting a result")]
    WorkerLost,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to encode capture as PNG: {0}")]
    Encode(#[from] image::ImageError),
    #[error("ftp host is not configured")]
    MissingHost,
}

/// Blocking store of one payload; run off the UI thread.
pub trait Transfer: Send + 'static {
    fn store(&self, request: &TransferRequest) -> Result<(), TransferError>;
}

/// Hands a locator to the desktop's default handler.
pub trait UriLauncher {
    fn launch(&self, uri: &str) -> Result<(), String>;
}

/// An immutable captured image shared by the presentation actions.
#[derive(Debug, Clone)]
pub struct Capture(Rc<RgbaImage>);

impl Capture {
    pub fn new(image: RgbaImage) -> Self {
        Self(Rc::new(image))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.0
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut bytes = Vec::new();
        self.0.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocator(String);

impl ResourceLocator {
    fn new(site: &str, file_name: &str) -> Self {
        Self(format!("{site}{file_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    Busy { status: String },
    Result { locator: ResourceLocator },
    Failed { message: String },
}

/// Drop content offering both the locator and the image bytes.
#[derive(Debug, Clone)]
pub struct DragPayload {
    pub uri_list: String,
    pub png: Arc<[u8]>,
    pub icon: RgbaImage,
}

pub fn random_file_name() -> String {
    let token: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(FILE_NAME_TOKEN_LEN)
        .map(char::from)
        .collect();
    format!("{token}{FILE_EXTENSION}")
}

/// Upload waiting for its single transfer result.
#[derive(Debug)]
pub struct BusyUpload {
    capture: Capture,
    png: Arc<[u8]>,
    file_name: String,
    site: String,
}

impl BusyUpload {
    /// Encodes the capture and binds its one transfer request to `transfer`.
    pub fn submit<T: Transfer>(
        capture: Capture,
        config: &FtpConfig,
        transfer: T,
    ) -> Result<(Self, PendingTransfer<T>), UploadError> {
        if config.host.trim().is_empty() {
            return Err(UploadError::MissingHost);
        }
        let png: Arc<[u8]> = capture.encode_png()?.into();
        let file_name = random_file_name();
        let request = TransferRequest {
            endpoint: FtpEndpoint::from_config(config),
            file_name: file_name.clone(),
            payload: png.clone(),
        };
        tracing::info!(
            host = %request.endpoint.host,
            port = request.endpoint.port,
            file_name = %file_name,
            bytes = png.len(),
            "submitting capture upload"
        );
        let busy = Self {
            capture,
            png,
            file_name,
            site: config.site.clone(),
        };
        Ok((busy, PendingTransfer { transfer, request }))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn presentation(&self) -> Presentation {
        Presentation::Busy {
            status: UPLOAD_STATUS.to_string(),
        }
    }

    pub fn complete(self, result: Result<(), TransferError>) -> UploadOutcome {
        match result {
            Ok(()) => {
                let locator = ResourceLocator::new(&self.site, &self.file_name);
                tracing::info!(%locator, "capture upload finished");
                UploadOutcome::Uploaded(UploadedCapture {
                    capture: self.capture,
                    png: self.png,
                    locator,
                })
            }
            Err(err) => {
                tracing::warn!(file_name = %self.file_name, %err, "capture upload failed");
                UploadOutcome::Failed(FailedUpload {
                    message: err.to_string(),
                })
            }
        }
    }
}

#[derive(Debug)]
pub enum UploadOutcome {
    Uploaded(UploadedCapture),
    Failed(FailedUpload),
}

impl UploadOutcome {
    pub fn presentation(&self) -> Presentation {
        match self {
            Self::Uploaded(uploaded) => Presentation::Result {
                locator: uploaded.locator.clone(),
            },
            Self::Failed(failed) => Presentation::Failed {
                message: failed.message.clone(),
            },
        }
    }
}

#[derive(Debug)]
pub struct FailedUpload {
    message: String,
}

impl FailedUpload {
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug)]
pub struct UploadedCapture {
    capture: Capture,
    png: Arc<[u8]>,
    locator: ResourceLocator,
}

impl UploadedCapture {
    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    pub fn capture(&self) -> &Capture {
        &self.capture
    }

    pub fn copy_locator(&self, clipboard: &dyn ClipboardBackend) -> ClipboardResult<&'static str> {
        clipboard.set_text(self.locator.as_str())?;
        Ok(URL_COPIED)
    }

    pub fn copy_image(&self, clipboard: &dyn ClipboardBackend) -> ClipboardResult<&'static str> {
        clipboard.set_png(&self.png)?;
        Ok(IMAGE_COPIED)
    }

    pub fn open_locator(&self, launcher: &dyn UriLauncher) -> Result<(), &'static str> {
        launcher.launch(self.locator.as_str()).map_err(|err| {
            tracing::warn!(locator = %self.locator, %err, "no handler accepted the upload url");
            OPEN_FAILED
        })
    }

    pub fn drag_payload(&self) -> DragPayload {
        let icon = DynamicImage::ImageRgba8(self.capture.image().clone())
            .resize_to_fill(DRAG_ICON_SIZE, DRAG_ICON_SIZE, FilterType::Triangle)
            .to_rgba8();
        DragPayload {
            uri_list: format!("{}\r\n", self.locator),
            png: self.png.clone(),
            icon,
        }
    }
}
