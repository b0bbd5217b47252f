//! CLI command implementations

pub mod account;
pub mod audit;
pub mod history;
pub mod login;
pub mod logs;
pub mod password;
pub mod register;
pub mod transfer;
pub mod user;
pub mod verify;

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::output;
use novabank_core::services::{EntryPoint, LogEvent, LoggingService};
use novabank_core::{NovaBankContext, OperationResult};

/// A command failure that has already been shown to the user
#[derive(Debug)]
pub struct Reported;

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("command failed")
    }
}

impl std::error::Error for Reported {}

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir();
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Data directory from `NOVABANK_DIR`, or `~/.novabank`
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("NOVABANK_DIR") {
        PathBuf::from(dir)
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".novabank")
    }
}

pub fn get_context() -> novabank_core::Result<NovaBankContext> {
    NovaBankContext::new(&get_data_dir())
}

/// Run one core operation the way every command does
///
/// Opens the context, runs `op`, records `command_executed` or
/// `command_failed` in the operational log and prints either the
/// [`OperationResult`] JSON or the human rendering. Failures are printed
/// here and surface as [`Reported`].
pub fn execute<T, F, R>(command: &str, json: bool, op: F, render: R) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&NovaBankContext) -> novabank_core::Result<T>,
    R: FnOnce(&T),
{
    let data = attempt(command, json, op)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&OperationResult::ok(&data))?);
    } else {
        render(&data);
    }
    Ok(())
}

/// First step of a multi-step command: failures are logged and printed like
/// [`execute`], success is handed back without output
pub fn attempt<T, F>(command: &str, json: bool, op: F) -> Result<T>
where
    F: FnOnce(&NovaBankContext) -> novabank_core::Result<T>,
{
    let logger = get_logger();

    match get_context().and_then(|ctx| op(&ctx)) {
        Ok(data) => {
            log_event(&logger, LogEvent::new("command_executed").with_command(command));
            Ok(data)
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("command_failed")
                    .with_command(command)
                    .with_core_error(&e),
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&OperationResult::<()>::fail(&e))?);
            } else {
                output::error(&e.user_message());
            }
            Err(Reported.into())
        }
    }
}

/// Use `given` or prompt for a password without echo
pub fn read_password(given: Option<String>, confirm: bool) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    let mut prompt = dialoguer::Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(prompt.interact()?)
}
