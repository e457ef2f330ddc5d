//! Archive sinks: where raw responses end up.
//!
//! Compression is a property of the sink. The archiver hands every record to
//! [`ArchiveSink::write`] and never knows whether the bytes are stored plain
//! or compressed.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;

/// Append-only byte stream with a logical name.
pub trait ArchiveSink: Send {
    /// Name used in error messages and logs.
    fn name(&self) -> &str;

    /// Writes one record, returning how many bytes were accepted.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Flushes buffered bytes.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Plain append-mode file.
#[derive(Debug)]
pub struct FileSink {
    name: String,
    file: File,
}

impl FileSink {
    /// Opens (creating if needed) `path` for appending.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from opening the file.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            name: path.display().to_string(),
            file,
        })
    }
}

impl ArchiveSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.file.write_all(bytes)?;
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Gzip-compressed file.
///
/// Appending to an existing file adds a new gzip member, which standard
/// tools decode as one concatenated stream. Call [`GzipSink::finish`] to
/// write the trailer; dropping the sink attempts it too, ignoring errors.
pub struct GzipSink {
    name: String,
    encoder: GzEncoder<File>,
}

impl GzipSink {
    /// Opens (creating if needed) `path` for appending compressed records.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from opening the file.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            name: path.display().to_string(),
            encoder: GzEncoder::new(file, Compression::default()),
        })
    }

    /// Completes the gzip stream and returns the file.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from writing the trailer.
    pub fn finish(self) -> io::Result<File> {
        self.encoder.finish()
    }
}

impl ArchiveSink for GzipSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.encoder.write_all(bytes)?;
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }
}
