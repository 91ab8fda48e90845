//! Argument handling for invocations that forward a capture request to the
//! running primary instance.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::bus::{RemoteCapture, RemoteCommand, SessionBusClient};
use crate::state::{DispatchEvent, DispatchState, StateMachine};

#[derive(Debug, Parser)]
#[command(
    name = "shotlift",
    about = "Powerful yet simple to use screenshot software.",
    disable_version_flag = true
)]
pub struct Cli {
    /// Show version information
    #[arg(short = 'v', long = "version", global = true)]
    pub version: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Capture the entire desktop.
    Full {
        /// Path where the capture will be saved
        #[arg(short, long, value_name = "DIR")]
        path: Option<PathBuf>,
        /// Save the capture to the clipboard
        #[arg(short, long)]
        clipboard: bool,
        /// Delay time in milliseconds
        #[arg(short, long, value_name = "MS", allow_negative_numbers = true)]
        delay: Option<i32>,
    },
    /// Start a manual capture in GUI mode.
    Gui {
        /// Path where the capture will be saved
        #[arg(short, long, value_name = "DIR")]
        path: Option<PathBuf>,
        /// Delay time in milliseconds
        #[arg(short, long, value_name = "MS", allow_negative_numbers = true)]
        delay: Option<i32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid path.")]
    InvalidPath,
    #[error("Invalid negative delay.")]
    NegativeDelay,
}

pub fn version_text() -> String {
    format!(
        "shotlift {}\nCompiled with GTK {}.{}.{}",
        env!("CARGO_PKG_VERSION"),
        gtk4::major_version(),
        gtk4::minor_version(),
        gtk4::micro_version()
    )
}

/// Checks path and delay; the path is tested before the delay.
pub fn validate(command: Command) -> Result<RemoteCommand, ValidationError> {
    match command {
        Command::Full {
            path,
            clipboard,
            delay,
        } => Ok(RemoteCommand::FullScreen {
            path: validate_path(path)?,
            to_clipboard: clipboard,
            delay: validate_delay(delay)?,
        }),
        Command::Gui { path, delay } => Ok(RemoteCommand::GraphicCapture {
            path: validate_path(path)?,
            delay: validate_delay(delay)?,
        }),
    }
}

fn validate_path(path: Option<PathBuf>) -> Result<String, ValidationError> {
    match path {
        None => Ok(String::new()),
        Some(path) if path.is_dir() => Ok(path.to_string_lossy().into_owned()),
        Some(_) => Err(ValidationError::InvalidPath),
    }
}

fn validate_delay(delay: Option<i32>) -> Result<i32, ValidationError> {
    match delay {
        Some(delay) if delay < 0 => Err(ValidationError::NegativeDelay),
        Some(delay) => Ok(delay),
        None => Ok(0),
    }
}

/// Validates `command` and, when valid, issues exactly one remote call.
/// The call's outcome is logged but does not change the resulting state.
pub fn dispatch(
    command: Command,
    remote: &dyn RemoteCapture,
    machine: &mut StateMachine,
) -> crate::AppResult<DispatchState> {
    let remote_command = match validate(command) {
        Ok(remote_command) => remote_command,
        Err(err) => {
            tracing::debug!(%err, "rejecting capture command");
            eprintln!("{err}");
            return Ok(machine.transition(DispatchEvent::RejectCommand)?);
        }
    };

    if let Err(err) = remote_command.send_to(remote) {
        tracing::warn!(
            method = remote_command.method_name(),
            %err,
            "remote capture call did not complete"
        );
    }
    Ok(machine.transition(DispatchEvent::ForwardCommand)?)
}

/// Handles a full argument vector, program name included.
pub fn run<I, T>(args: I) -> anyhow::Result<ExitCode>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    run_with(Cli::parse_from(args), &SessionBusClient)
}

/// `--version` wins over any subcommand and its arguments.
fn run_with(cli: Cli, remote: &dyn RemoteCapture) -> anyhow::Result<ExitCode> {
    if cli.version {
        println!("{}", version_text());
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        tracing::debug!("no capture command given");
        return Ok(ExitCode::SUCCESS);
    };

    let mut machine = StateMachine::new();
    let state = dispatch(command, remote, &mut machine)
        .context("failed to dispatch capture command")?;
    tracing::debug!(?state, "command dispatch finished");
    Ok(ExitCode::SUCCESS)
}
