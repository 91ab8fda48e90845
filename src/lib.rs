use std::ffi::OsString;
use std::process::ExitCode;

pub mod app;
pub mod bus;
pub mod capture;
pub mod cli;
pub mod clipboard;
mod config;
pub mod error;
pub mod logging;
pub mod notification;
pub mod state;
pub mod storage;
pub mod upload;
pub use error::{AppError, AppResult};

use state::{DispatchEvent, StateMachine};

/// Entrypoint used by the binary: no arguments starts the primary instance,
/// anything else is parsed as a command for the running one.
pub fn run() -> ExitCode {
    logging::init();

    let args: Vec<OsString> = std::env::args_os().collect();
    if args.len() > 1 {
        return match cli::run(args) {
            Ok(code) => code,
            Err(err) => {
                tracing::error!("command dispatch failed: {err:#}");
                ExitCode::FAILURE
            }
        };
    }

    let mut machine = StateMachine::new();
    if let Err(err) = machine.transition(DispatchEvent::LaunchPrimary) {
        tracing::error!(%err, "cannot enter primary role");
        return ExitCode::FAILURE;
    }
    tracing::info!("starting shotlift primary instance with state={machine}");

    match app::App::new().start() {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(%err, "primary instance failed");
            ExitCode::FAILURE
        }
    }
}
