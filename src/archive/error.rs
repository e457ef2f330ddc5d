//! Error types for raw-response archiving.

use thiserror::Error;

/// Errors writing an archive record.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The sink accepted fewer bytes than the record holds.
    #[error("short write to archive {sink}: expected {expected} bytes, wrote {actual}")]
    ShortWrite {
        /// Logical name of the sink.
        sink: String,
        expected: usize,
        actual: usize,
    },

    /// The sink's write primitive failed.
    #[error("archive {sink} write failed: {source}")]
    Io {
        sink: String,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    pub fn short_write(sink: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShortWrite {
            sink: sink.into(),
            expected,
            actual,
        }
    }

    pub fn io(sink: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            sink: sink.into(),
            source,
        }
    }
}
