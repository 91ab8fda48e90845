use std::cell::RefCell;
use std::process::ExitCode;
use std::rc::Rc;
use std::sync::{mpsc, Arc};

use gtk4::prelude::*;
use gtk4::{gio, Application};

use crate::bus::{self, BusError, RemoteCommand};
use crate::capture::SystemCaptureBackend;
use crate::clipboard::GdkClipboard;
use crate::config::{load_app_config, AppConfig};
use crate::error::AppResult;
use crate::storage::StorageService;

mod controller;
mod toast;
mod upload_window;
mod worker;

use self::controller::Controller;
use self::worker::attach_queue;

const APPLICATION_ID: &str = "io.github.shotlift";

/// Resources that must outlive the main loop of the primary instance.
#[derive(Default)]
struct PrimaryRuntime {
    bus_connection: Option<zbus::blocking::Connection>,
    hold_guard: Option<gio::ApplicationHoldGuard>,
    startup_error: Option<BusError>,
}

/// The long-lived primary instance.
pub struct App {
    config: AppConfig,
}

impl App {
    pub fn new() -> Self {
        Self {
            config: load_app_config(),
        }
    }

    /// Runs the GTK main loop until the application quits. Uniqueness of
    /// `APPLICATION_ID` keeps a second launch from becoming another primary.
    pub fn start(self) -> AppResult<ExitCode> {
        let storage = StorageService::from_config(self.config.save_dir.clone())?;
        tracing::info!(save_dir = %storage.default_dir().display(), "resolved capture directory");

        let application = Application::new(Some(APPLICATION_ID), gio::ApplicationFlags::empty());
        let runtime = Rc::new(RefCell::new(PrimaryRuntime::default()));
        let ftp = self.config.ftp.clone();

        let runtime_for_startup = runtime.clone();
        application.connect_startup(move |app| {
            let (tx, rx) = mpsc::channel::<RemoteCommand>();
            let connection = match bus::serve(tx) {
                Ok(connection) => connection,
                Err(err) => {
                    tracing::error!(%err, "failed to register capture service");
                    runtime_for_startup.borrow_mut().startup_error = Some(err);
                    app.quit();
                    return;
                }
            };

            let controller = Rc::new(Controller::new(
                app.clone(),
                storage.clone(),
                ftp.clone(),
                Arc::new(SystemCaptureBackend),
                Rc::new(GdkClipboard),
            ));
            attach_queue(rx, move |command| controller.handle(command));

            let mut runtime = runtime_for_startup.borrow_mut();
            runtime.bus_connection = Some(connection);
            let hold_guard = <Application as gio::prelude::ApplicationExtManual>::hold(app);
            runtime.hold_guard = Some(hold_guard);
            tracing::info!("primary instance ready for capture requests");
        });

        application.connect_activate(|_| {
            tracing::debug!("primary instance activated");
        });

        // Only argv[0] reaches GTK; command arguments are never handled here.
        let program = std::env::args().next().unwrap_or_else(|| "shotlift".to_string());
        let code = application.run_with_args(&[program]);

        let mut runtime = runtime.borrow_mut();
        runtime.hold_guard.take();
        runtime.bus_connection.take();
        if let Some(err) = runtime.startup_error.take() {
            return Err(err.into());
        }
        tracing::info!(code = code.get(), "primary instance stopped");
        Ok(u8::try_from(code.get()).map_or(ExitCode::FAILURE, ExitCode::from))
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
