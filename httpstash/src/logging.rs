//! Logging setup for binaries embedding the client.
//!
//! The library itself only emits `tracing` events; calling [`init`] is
//! optional.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LOG_FILE: &str = "httpstash.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to install subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Directive used when `RUST_LOG` is not set.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "httpstash=debug,info"
    } else {
        "info"
    }
}

/// Install the global subscriber.
///
/// Events go to stderr and, when `log_file` is given, to that file through a
/// non-blocking writer. `RUST_LOG` overrides the level.
///
/// # Returns
///
/// The file writer's guard. Keep it alive until exit or buffered lines are
/// lost.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    let console = fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .try_init()?;
        return Ok(None);
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|source| LoggingError::CreateDir {
        path: dir.clone(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| DEFAULT_LOG_FILE.into());

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    let file_layer = fmt::layer().with_ansi(false).with_writer(writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()?;
    Ok(Some(guard))
}
