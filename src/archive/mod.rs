//! Raw-response archiving.
//!
//! An [`Archiver`] appends one record per response to an [`ArchiveSink`]:
//! an optional prefix line, then the raw bytes, each terminated by the
//! configured end-of-line marker. Every successful append bumps a shared
//! counter by exactly one, whatever the sink type.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use outcall_core::archive::{Archiver, GzipSink};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = GzipSink::open(Path::new("responses.log.gz"))?;
//! let mut archiver = Archiver::new(Box::new(sink));
//! archiver.append(br#"{"id":1}"#, Some("GET https://api.example.com/v1/items/1"))?;
//! assert_eq!(archiver.writes(), 1);
//! # Ok(())
//! # }
//! ```

mod error;
mod sink;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, instrument};

pub use error::ArchiveError;
pub use sink::{ArchiveSink, FileSink, GzipSink};

/// Default record terminator.
pub const DEFAULT_EOL: &str = "\n";

/// Appends raw responses to a sink and counts successful writes.
///
/// Not internally synchronized; share it behind a mutex so concurrent
/// writers are serialized per record.
pub struct Archiver {
    sink: Box<dyn ArchiveSink>,
    eol: String,
    writes: Arc<AtomicU64>,
}

impl Archiver {
    /// Creates an archiver with `"\n"` line endings and a fresh counter.
    #[must_use]
    pub fn new(sink: Box<dyn ArchiveSink>) -> Self {
        Self {
            sink,
            eol: DEFAULT_EOL.to_string(),
            writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Sets the record terminator.
    #[must_use]
    pub fn with_eol(mut self, eol: impl Into<String>) -> Self {
        self.eol = eol.into();
        self
    }

    /// Counts writes into a caller-owned counter.
    #[must_use]
    pub fn with_counter(mut self, counter: Arc<AtomicU64>) -> Self {
        self.writes = counter;
        self
    }

    /// The shared write counter.
    #[must_use]
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.writes)
    }

    /// Number of successful appends recorded so far.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    /// Writes `prefix EOL raw EOL` (prefix segment omitted when absent) as a
    /// single call to the sink's write primitive.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::ShortWrite`] if the sink accepted fewer bytes
    /// than the record holds, or [`ArchiveError::Io`] if the write failed.
    #[instrument(skip(self, raw), fields(sink = %self.sink.name(), bytes = raw.len()))]
    pub fn append(&mut self, raw: &[u8], prefix: Option<&str>) -> Result<(), ArchiveError> {
        let mut record = Vec::with_capacity(
            prefix.map_or(0, |p| p.len() + self.eol.len()) + raw.len() + self.eol.len(),
        );
        if let Some(prefix) = prefix {
            record.extend_from_slice(prefix.as_bytes());
            record.extend_from_slice(self.eol.as_bytes());
        }
        record.extend_from_slice(raw);
        record.extend_from_slice(self.eol.as_bytes());

        let written = self
            .sink
            .write(&record)
            .map_err(|e| ArchiveError::io(self.sink.name(), e))?;
        if written != record.len() {
            return Err(ArchiveError::short_write(
                self.sink.name(),
                record.len(),
                written,
            ));
        }

        let total = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(total, "archived raw response");
        Ok(())
    }

    /// Flushes the sink.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] if the sink cannot flush.
    pub fn flush(&mut self) -> Result<(), ArchiveError> {
        self.sink
            .flush()
            .map_err(|e| ArchiveError::io(self.sink.name(), e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sink writing into a shared buffer, accepting at most `limit` bytes per write.
    struct MemorySink {
        buffer: Arc<Mutex<Vec<u8>>>,
        limit: Option<usize>,
    }

    impl MemorySink {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buffer = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    buffer: Arc::clone(&buffer),
                    limit: None,
                },
                buffer,
            )
        }
    }

    impl ArchiveSink for MemorySink {
        fn name(&self) -> &str {
            "memory"
        }

        fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
            let n = self.limit.map_or(bytes.len(), |l| l.min(bytes.len()));
            self.buffer.lock().unwrap().extend_from_slice(&bytes[..n]);
            Ok(n)
        }
    }

    #[test]
    fn test_two_appends_without_prefix() {
        let (sink, buffer) = MemorySink::new();
        let mut archiver = Archiver::new(Box::new(sink));
        archiver.append(b"body1", None).unwrap();
        archiver.append(b"body2", None).unwrap();
        assert_eq!(*buffer.lock().unwrap(), b"body1\nbody2\n");
        assert_eq!(archiver.writes(), 2);
    }

    #[test]
    fn test_prefix_and_custom_eol() {
        let (sink, buffer) = MemorySink::new();
        let mut archiver = Archiver::new(Box::new(sink)).with_eol("\r\n");
        archiver.append(b"{}", Some("GET /v1")).unwrap();
        assert_eq!(*buffer.lock().unwrap(), b"GET /v1\r\n{}\r\n");
    }

    #[test]
    fn test_short_write_is_error_and_not_counted() {
        let (mut sink, _buffer) = MemorySink::new();
        sink.limit = Some(3);
        let mut archiver = Archiver::new(Box::new(sink));
        let err = archiver.append(b"abcdef", None).unwrap_err();
        match err {
            ArchiveError::ShortWrite {
                sink,
                expected,
                actual,
            } => {
                assert_eq!(sink, "memory");
                assert_eq!(expected, 7);
                assert_eq!(actual, 3);
            }
            other => panic!("expected ShortWrite, got {other:?}"),
        }
        assert_eq!(archiver.writes(), 0);
    }

    #[test]
    fn test_shared_counter_is_external() {
        let counter = Arc::new(AtomicU64::new(10));
        let (sink, _buffer) = MemorySink::new();
        let mut archiver = Archiver::new(Box::new(sink)).with_counter(Arc::clone(&counter));
        archiver.append(b"x", None).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_counter_handle_shares_writes_with_second_archiver() {
        let (first_sink, _) = MemorySink::new();
        let (second_sink, _) = MemorySink::new();
        let mut first = Archiver::new(Box::new(first_sink));
        let mut second = Archiver::new(Box::new(second_sink)).with_counter(first.counter());
        assert_eq!(second.sink_name(), "memory");

        first.append(b"a", None).unwrap();
        second.append(b"b", None).unwrap();
        assert_eq!(first.writes(), 2);
        assert_eq!(second.writes(), 2);
    }
}
