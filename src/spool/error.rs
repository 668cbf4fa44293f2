//! Spool-specific error types.
//!
//! All spool operations return [`SpoolError`] on failure. I/O errors carry the
//! path they happened on so log lines point at the offending file.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the spool layer.
#[derive(Debug, Error)]
pub enum SpoolError {
    /// Filesystem operation failed.
    #[error("i/o error on '{}': {source}", path.display())]
    Io {
        /// Path the operation was applied to.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Write attempted while no bucket is open.
    #[error("no bucket is open for writing")]
    NoOpenBucket,
}

impl SpoolError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
