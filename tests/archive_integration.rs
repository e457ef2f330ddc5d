//! Integration tests for archiving to plain and gzip files.

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use flate2::read::MultiGzDecoder;
use outcall_core::{Archiver, FileSink, GzipSink};
use tempfile::TempDir;

#[test]
fn test_plain_and_gzip_archives_hold_same_records() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let plain_path = temp_dir.path().join("raw.log");
    let gzip_path = temp_dir.path().join("raw.log.gz");
    let counter = Arc::new(AtomicU64::new(0));

    {
        let mut plain = Archiver::new(Box::new(FileSink::open(&plain_path).expect("open plain")))
            .with_counter(Arc::clone(&counter));
        let mut gzip = Archiver::new(Box::new(GzipSink::open(&gzip_path).expect("open gzip")))
            .with_counter(Arc::clone(&counter));

        for archiver in [&mut plain, &mut gzip] {
            archiver.append(b"body1", None).expect("append");
            archiver.append(b"body2", Some("POST /v1/orders")).expect("append");
            archiver.flush().expect("flush");
        }
    }

    // One increment per append, regardless of sink.
    assert_eq!(counter.load(Ordering::SeqCst), 4);

    let expected = "body1\nPOST /v1/orders\nbody2\n";
    let plain = std::fs::read_to_string(&plain_path).expect("read plain");
    assert_eq!(plain, expected);

    let mut decoded = String::new();
    MultiGzDecoder::new(std::fs::File::open(&gzip_path).expect("open gz"))
        .read_to_string(&mut decoded)
        .expect("decode gzip");
    assert_eq!(decoded, expected);
}

#[test]
fn test_gzip_archive_appends_across_sessions() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let path = temp_dir.path().join("raw.log.gz");

    for body in [&b"first"[..], &b"second"[..]] {
        let mut archiver = Archiver::new(Box::new(GzipSink::open(&path).expect("open gzip")));
        archiver.append(body, None).expect("append");
    }

    let mut decoded = String::new();
    MultiGzDecoder::new(std::fs::File::open(&path).expect("open gz"))
        .read_to_string(&mut decoded)
        .expect("decode gzip");
    assert_eq!(decoded, "first\nsecond\n");
}
