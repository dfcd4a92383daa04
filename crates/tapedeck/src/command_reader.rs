//! Terminal command reader.
//!
//! Reads stdin line by line on a dedicated thread, parses each line into an
//! [`AppCommand`] and forwards it to the application loop.

use crate::{AppCommand, AppError, AppResult};

use std::{
    io::{BufRead, stdin},
    panic::Location,
    thread::{self, JoinHandle},
};

use error_location::ErrorLocation;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

/// Forwards parsed terminal commands to the app.
pub struct CommandReader {
    command_tx: mpsc::Sender<AppCommand>,
}

impl CommandReader {
    /// Reader sending into `command_tx`.
    pub fn new(command_tx: mpsc::Sender<AppCommand>) -> Self {
        Self { command_tx }
    }

    /// Start reading stdin on a detached thread.
    ///
    /// The thread is detached and may outlive the runtime.
    #[track_caller]
    pub fn spawn(self) -> AppResult<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("command-reader".to_string())
            .spawn(move || self.run(stdin().lock()))?;
        Ok(handle)
    }

    /// Forward every command in `input`, then `Quit` once input ends.
    ///
    /// Stops early when the app has gone away.
    #[instrument(skip_all)]
    pub fn run<R: BufRead>(&self, input: R) {
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Failed to read command");
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match AppCommand::parse(&line) {
                Ok(command) => {
                    if let Err(e) = self.forward(command) {
                        debug!(error = ?e, "App stopped listening, command reader exiting");
                        return;
                    }
                }
                Err(AppError::UnknownCommand { input, reason, .. }) => {
                    println!("Unknown command '{}': {}", input, reason);
                }
                Err(e) => println!("{}", e),
            }
        }

        debug!("Input closed");
        let _ = self.forward(AppCommand::Quit);
    }

    #[track_caller]
    fn forward(&self, command: AppCommand) -> AppResult<()> {
        self.command_tx
            .blocking_send(command)
            .map_err(|e| AppError::ChannelSendFailed {
                message: format!("Failed to send {:?}", e.0),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}
