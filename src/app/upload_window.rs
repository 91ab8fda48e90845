use std::cell::Cell;
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{
    gdk, gio, glib, Align, Application, ApplicationWindow, Box as GtkBox, Button, DragSource,
    EventControllerKey, Label, Orientation, Picture, Spinner,
};
use image::RgbaImage;

use crate::clipboard::{bytes_provider, ClipboardBackend, MIME_IMAGE_PNG, MIME_TEXT_URI_LIST};
use crate::upload::{
    BusyUpload, Capture, FtpConfig, FtpTransfer, Presentation, TransferError, UploadOutcome,
    UploadedCapture, UriLauncher,
};

use super::toast::{ToastRuntime, TOAST_DURATION_MS};
use super::worker::spawn_worker_action;

const WINDOW_TITLE: &str = "Upload to FTP";
const UPLOAD_BUTTON_LABEL: &str = "Upload";
const LAYOUT_SPACING: i32 = 8;
const LAYOUT_MARGIN: i32 = 12;
const PREVIEW_MIN_SIZE: i32 = 240;

#[derive(Debug, Default)]
pub(super) struct GioUriLauncher;

impl UriLauncher for GioUriLauncher {
    fn launch(&self, uri: &str) -> Result<(), String> {
        gio::AppInfo::launch_default_for_uri(uri, None::<&gio::AppLaunchContext>)
            .map_err(|err| err.to_string())
    }
}

/// Status area shared by the prompt, busy and terminal phases.
struct StatusWidgets {
    spinner: Spinner,
    label: Label,
}

impl StatusWidgets {
    fn render(&self, presentation: &Presentation) {
        let text = match presentation {
            Presentation::Busy { status } => status.as_str(),
            Presentation::Result { locator } => locator.as_str(),
            Presentation::Failed { message } => message.as_str(),
        };
        self.label.set_text(text);
        self.label.set_selectable(matches!(presentation, Presentation::Result { .. }));
        if matches!(presentation, Presentation::Busy { .. }) {
            self.spinner.set_visible(true);
            self.spinner.start();
        } else {
            self.spinner.stop();
            self.spinner.set_visible(false);
        }
    }
}

/// Opens the upload window for `capture`. The transfer starts right away
/// when `auto_upload` is set, otherwise on the Upload button.
pub(super) fn open_upload_window(
    app: &Application,
    capture: Capture,
    ftp: &FtpConfig,
    clipboard: Rc<dyn ClipboardBackend>,
) {
    let window = ApplicationWindow::builder()
        .application(app)
        .title(WINDOW_TITLE)
        .build();
    let layout = GtkBox::new(Orientation::Vertical, LAYOUT_SPACING);
    layout.set_margin_top(LAYOUT_MARGIN);
    layout.set_margin_bottom(LAYOUT_MARGIN);
    layout.set_margin_start(LAYOUT_MARGIN);
    layout.set_margin_end(LAYOUT_MARGIN);
    window.set_child(Some(&layout));

    let spinner = Spinner::new();
    spinner.set_halign(Align::Center);
    spinner.set_visible(false);
    let label = Label::new(None);
    layout.append(&spinner);
    layout.append(&label);
    let status = Rc::new(StatusWidgets { spinner, label });

    let closable = Rc::new(Cell::new(true));
    install_close_on_escape(&window, closable.clone());
    let session = UploadSession {
        layout,
        status,
        closable,
        clipboard,
    };

    if ftp.auto_upload {
        window.present();
        session.start(capture, ftp);
        return;
    }

    let picture = preview_picture(capture.image());
    let upload = Button::with_label(UPLOAD_BUTTON_LABEL);
    upload.set_halign(Align::Center);
    session.layout.prepend(&picture);
    session.layout.append(&upload);
    window.present();

    let pending_capture = Cell::new(Some(capture));
    let ftp = ftp.clone();
    upload.connect_clicked(move |button| {
        let Some(capture) = pending_capture.take() else {
            return;
        };
        session.layout.remove(&picture);
        session.layout.remove(button);
        session.start(capture, &ftp);
    });
}

struct UploadSession {
    layout: GtkBox,
    status: Rc<StatusWidgets>,
    closable: Rc<Cell<bool>>,
    clipboard: Rc<dyn ClipboardBackend>,
}

impl UploadSession {
    /// Submits `capture` and runs its single transfer on a worker thread.
    fn start(&self, capture: Capture, ftp: &FtpConfig) {
        let (busy, pending) = match BusyUpload::submit(capture, ftp, FtpTransfer) {
            Ok(submitted) => submitted,
            Err(err) => {
                tracing::warn!(%err, "could not prepare capture upload");
                self.status.render(&Presentation::Failed {
                    message: err.to_string(),
                });
                return;
            }
        };
        self.status.render(&busy.presentation());
        self.closable.set(false);

        let layout = self.layout.clone();
        let status = self.status.clone();
        let closable = self.closable.clone();
        let clipboard = self.clipboard.clone();
        spawn_worker_action(
            move || pending.run(),
            move |result| {
                let outcome = busy.complete(result.unwrap_or(Err(TransferError::WorkerLost)));
                status.render(&outcome.presentation());
                if let UploadOutcome::Uploaded(uploaded) = outcome {
                    show_result(&layout, Rc::new(uploaded), clipboard);
                }
                closable.set(true);
            },
        );
    }
}

fn show_result(
    layout: &GtkBox,
    uploaded: Rc<UploadedCapture>,
    clipboard: Rc<dyn ClipboardBackend>,
) {
    let toast = ToastRuntime::new();
    layout.append(toast.widget());

    let picture = preview_picture(uploaded.capture().image());
    picture.add_controller(drag_source_for(uploaded.clone()));
    layout.append(&picture);

    let buttons = GtkBox::new(Orientation::Horizontal, LAYOUT_SPACING);
    buttons.set_halign(Align::Center);
    layout.append(&buttons);

    let copy_url = Button::with_label("Copy URL");
    let open_url = Button::with_label("Open URL");
    let copy_image = Button::with_label("Image to Clipboard.");
    buttons.append(&copy_url);
    buttons.append(&open_url);
    buttons.append(&copy_image);

    {
        let uploaded = uploaded.clone();
        let clipboard = clipboard.clone();
        let toast = toast.clone();
        copy_url.connect_clicked(move |_| match uploaded.copy_locator(clipboard.as_ref()) {
            Ok(notice) => toast.show(notice, TOAST_DURATION_MS),
            Err(err) => {
                tracing::warn!(%err, "failed to copy upload url");
                toast.show(err.to_string(), TOAST_DURATION_MS);
            }
        });
    }
    {
        let uploaded = uploaded.clone();
        let toast = toast.clone();
        open_url.connect_clicked(move |_| {
            if let Err(notice) = uploaded.open_locator(&GioUriLauncher) {
                toast.show(notice, TOAST_DURATION_MS);
            }
        });
    }
    copy_image.connect_clicked(move |_| match uploaded.copy_image(clipboard.as_ref()) {
        Ok(notice) => toast.show(notice, TOAST_DURATION_MS),
        Err(err) => {
            tracing::warn!(%err, "failed to copy uploaded image");
            toast.show(err.to_string(), TOAST_DURATION_MS);
        }
    });
}

fn drag_source_for(uploaded: Rc<UploadedCapture>) -> DragSource {
    let drag_source = DragSource::new();
    drag_source.set_actions(gdk::DragAction::COPY);
    drag_source.connect_prepare(move |source, _x, _y| {
        let payload = uploaded.drag_payload();
        source.set_icon(Some(&texture_from_rgba(&payload.icon)), 0, 0);
        tracing::debug!(locator = %uploaded.locator(), "starting upload drag");
        Some(gdk::ContentProvider::new_union(&[
            bytes_provider(MIME_TEXT_URI_LIST, payload.uri_list.as_bytes()),
            bytes_provider(MIME_IMAGE_PNG, &payload.png),
        ]))
    });
    drag_source
}

fn preview_picture(image: &RgbaImage) -> Picture {
    let picture = Picture::for_paintable(&texture_from_rgba(image));
    picture.set_can_shrink(true);
    picture.set_hexpand(true);
    picture.set_vexpand(true);
    picture.set_size_request(PREVIEW_MIN_SIZE, PREVIEW_MIN_SIZE);
    picture
}

fn texture_from_rgba(image: &RgbaImage) -> gdk::MemoryTexture {
    let (width, height) = image.dimensions();
    let bytes = glib::Bytes::from(image.as_raw().as_slice());
    gdk::MemoryTexture::new(
        width as i32,
        height as i32,
        gdk::MemoryFormat::R8g8b8a8,
        &bytes,
        width as usize * 4,
    )
}

/// Escape closes the window except while a transfer is in flight.
fn install_close_on_escape(window: &ApplicationWindow, closable: Rc<Cell<bool>>) {
    let controller = EventControllerKey::new();
    let weak_window = window.downgrade();
    controller.connect_key_pressed(move |_, key, _, _| {
        if key != gdk::Key::Escape || !closable.get() {
            return glib::Propagation::Proceed;
        }
        if let Some(window) = weak_window.upgrade() {
            window.close();
        }
        glib::Propagation::Stop
    });
    window.add_controller(controller);
}
