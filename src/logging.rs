//! Tracing subscriber setup.
//!
//! Console output always; with a log directory, a second plain-text layer
//! writes to daily files named `dc.<date>.log`, keeping the last
//! [`LOG_RETENTION_DAYS`] of them.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,data_collector=debug";

/// File name prefix of rotated log files.
pub const LOG_FILE_PREFIX: &str = "dc";

/// Number of daily log files kept on disk.
pub const LOG_RETENTION_DAYS: usize = 7;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Log directory could not be created.
    #[error("failed to create log directory {path}: {source}")]
    Io {
        /// Directory.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Rolling appender could not be built.
    #[error("failed to open log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Daily rotating appender under `dir`, creating the directory if needed.
pub fn file_appender(dir: &Path) -> Result<RollingFileAppender, LoggingError> {
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(LOG_RETENTION_DAYS)
        .build(dir)?;
    Ok(appender)
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; hold it until exit.
pub fn init_logging(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, LoggingError> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(dir)?);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(fmt::layer())
        .with(file_layer)
        .try_init()?;

    if let Some(dir) = log_dir {
        tracing::info!(dir = %dir.display(), retention_days = LOG_RETENTION_DAYS, "Logging to files");
    }
    Ok(guard)
}
