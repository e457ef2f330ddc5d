//! Integration tests for cross-process throttling.
//!
//! Separate throttle handles over one state directory stand in for separate
//! processes; they share nothing but the files.

use std::time::{Duration, Instant};

use outcall_core::{CrossProcessThrottle, ThrottleIdentity};
use tempfile::TempDir;

#[tokio::test]
async fn test_handles_sharing_dir_enforce_interval() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let identity = ThrottleIdentity::from_seed("billing-api");
    let interval = Duration::from_millis(500);

    let a = CrossProcessThrottle::new(temp_dir.path());
    let b = CrossProcessThrottle::new(temp_dir.path());

    let start = Instant::now();
    let first = a.wait_turn(&identity, interval).await.expect("first turn");
    b.wait_turn(&identity, interval).await.expect("second turn");

    assert_eq!(first, Duration::ZERO);
    assert!(
        start.elapsed() >= interval,
        "second caller should be held back, elapsed {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn test_concurrent_callers_are_serialized() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let identity = ThrottleIdentity::from_seed("search-api");
    let interval = Duration::from_millis(200);

    let start = Instant::now();
    let handles: Vec<_> = (0..3)
        .map(|_| {
            let throttle = CrossProcessThrottle::new(temp_dir.path());
            let identity = identity.clone();
            tokio::spawn(async move { throttle.wait_turn(&identity, interval).await })
        })
        .collect();
    for handle in handles {
        handle.await.expect("task panicked").expect("turn granted");
    }

    // Three callers need two full intervals between them.
    assert!(
        start.elapsed() >= interval * 2,
        "callers should be spaced, elapsed {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn test_different_identities_do_not_block_each_other() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let throttle = CrossProcessThrottle::new(temp_dir.path());
    let interval = Duration::from_secs(5);

    let start = Instant::now();
    throttle
        .wait_turn(&ThrottleIdentity::from_seed("service-a"), interval)
        .await
        .expect("turn a");
    throttle
        .wait_turn(&ThrottleIdentity::from_seed("service-b"), interval)
        .await
        .expect("turn b");

    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_recorded_call_is_visible_to_other_handle() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let identity = ThrottleIdentity::from_seed("ledger");

    let writer = CrossProcessThrottle::new(temp_dir.path());
    let reader = CrossProcessThrottle::new(temp_dir.path());

    assert_eq!(reader.last_call(&identity).await.expect("read"), None);
    writer.record_call(&identity).await.expect("record");
    assert!(reader.last_call(&identity).await.expect("read").is_some());
}
