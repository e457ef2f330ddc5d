//! Error types for the cross-process throttle.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the throttle's lock and state files.
#[derive(Debug, Error)]
pub enum ThrottleError {
    /// Creating, locking, reading, or writing a state file failed.
    #[error("throttle state I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking worker running the lock protocol did not complete.
    #[error("throttle worker for {identity} did not complete: {message}")]
    Worker { identity: String, message: String },
}

impl ThrottleError {
    /// Creates an I/O error for a state path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
