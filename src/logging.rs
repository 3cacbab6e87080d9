//! Tracing subscriber setup.
//!
//! The filter comes from `RUST_LOG` (default `info`). Line-oriented commands
//! log to stderr; the TUI owns the terminal, so it logs to a file instead.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::AppError;

/// Directory for the TUI log file.
pub const LOG_DIR: &str = "logs";
/// File name of the TUI log.
pub const LOG_FILE: &str = "aix.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File,
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the program.
pub fn init(target: LogTarget) -> Result<Option<WorkerGuard>, AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match target {
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .with(filter)
                .try_init()
                .ok();
            Ok(None)
        }
        LogTarget::File => {
            std::fs::create_dir_all(LOG_DIR)
                .map_err(|e| AppError::new(4, format!("Failed to create log directory '{LOG_DIR}': {e}")))?;
            let appender = tracing_appender::rolling::never(Path::new(LOG_DIR), LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .with(filter)
                .try_init()
                .ok();
            Ok(Some(guard))
        }
    }
}
