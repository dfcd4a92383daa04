//! Tapedeck: terminal audio recorder with live metering, playback, a
//! metronome and archive export.

mod app;
mod app_command;
mod command_reader;
mod config;
mod display;
mod error;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    command_reader::CommandReader,
    error::{AppError, Result as AppResult},
};

use crate::config::Config;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "tapedeck=debug,tapedeck_core=debug";

/// Application entry point.
#[tokio::main]
async fn main() {
    // Dropping the guard flushes and stops the file writer.
    let _log_guard = init_logging();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    let (command_tx, command_rx) = mpsc::channel(32);

    if let Err(e) = CommandReader::new(command_tx).spawn() {
        error!("Failed to start command reader: {:?}", e);
        std::process::exit(1);
    }

    let app = App::new(config, command_rx).await;

    if let Err(e) = app.run().await {
        error!(error = ?e, "App error");
    }
}

/// Log to stderr and, when a data directory exists, to a daily log file.
fn init_logging() -> Option<WorkerGuard> {
    let filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let appender = Config::log_dir().ok().and_then(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("tapedeck")
            .filename_suffix("log")
            .build(&dir)
            .ok()
            .map(|appender| (dir, appender))
    });

    match appender {
        Some((dir, appender)) => {
            let (file_writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter())
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(file_writer))
                .init();
            info!(log_dir = ?dir, "File logging enabled");
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter())
                .with(stderr_layer)
                .init();
            warn!("Log directory unavailable, logging to stderr only");
            None
        }
    }
}
