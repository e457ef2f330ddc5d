//! Cross-process minimum spacing between calls to the same remote service.
//!
//! This module provides [`CrossProcessThrottle`], which enforces a minimum
//! delay between calls sharing a [`ThrottleIdentity`], across every process on
//! the host.
//!
//! # Overview
//!
//! Each identity owns one small state file under a shared directory holding
//! the epoch-millisecond timestamp of its last call. The file doubles as the
//! named lock: every read or write of the timestamp happens under an
//! exclusive advisory lock (`fs2`), and a waiter sleeps **while holding the
//! lock**, so waiters are serialized instead of racing each other. Unrelated
//! identities use unrelated files and never block each other.
//!
//! The lock protocol is blocking file I/O and runs on tokio's blocking pool.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use outcall_core::throttle::{CrossProcessThrottle, ThrottleIdentity};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let throttle = CrossProcessThrottle::in_temp_dir();
//! let identity = ThrottleIdentity::from_seed("billing-api");
//!
//! // Returns once at least 500ms have passed since the last billing-api call
//! // made by any process on this host.
//! throttle.wait_turn(&identity, Duration::from_millis(500)).await?;
//! # Ok(())
//! # }
//! ```

mod error;

use std::ffi::OsStr;
use std::fmt::{self, Write as _};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fs2::FileExt;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

pub use error::ThrottleError;

/// Directory name used under the system temp dir by [`CrossProcessThrottle::in_temp_dir`].
pub const DEFAULT_DIR_NAME: &str = "outcall-throttle";

/// Extension of per-identity state files.
const STATE_EXTENSION: &str = "throttle";

/// Waits at least this long are logged at warn level.
const LONG_WAIT_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

/// Stable name for "which remote service/configuration" a call belongs to.
///
/// Derived from a seed describing the coordinator type or configuration, never
/// from a process or instance, so every process computes the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThrottleIdentity(String);

impl ThrottleIdentity {
    /// Hashes a seed (SHA-256, first 16 bytes as hex) into an identity.
    #[must_use]
    pub fn from_seed(seed: &str) -> Self {
        let digest = Sha256::digest(seed.as_bytes());
        let mut hex = String::with_capacity(32);
        for byte in &digest[..16] {
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThrottleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host-wide call spacing keyed by identity.
///
/// Cheap to clone; holds only the shared state directory. Every operation
/// opens its own file handle, so two throttles in one process exclude each
/// other exactly like two processes do.
#[derive(Debug, Clone)]
pub struct CrossProcessThrottle {
    dir: PathBuf,
}

impl Default for CrossProcessThrottle {
    fn default() -> Self {
        Self::in_temp_dir()
    }
}

impl CrossProcessThrottle {
    /// Creates a throttle keeping state files in `dir` (created on first use).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a throttle under the system temp directory.
    #[must_use]
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir().join(DEFAULT_DIR_NAME))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn state_path(&self, identity: &ThrottleIdentity) -> PathBuf {
        self.dir.join(format!("{identity}.{STATE_EXTENSION}"))
    }

    /// Blocks until at least `min_interval` has elapsed since the last
    /// recorded call for `identity`, then records "now".
    ///
    /// Returns how long the caller was held back.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError`] if the state file cannot be created, locked,
    /// read, or written.
    #[instrument(skip(self), fields(identity = %identity, interval_ms = min_interval.as_millis()))]
    pub async fn wait_turn(
        &self,
        identity: &ThrottleIdentity,
        min_interval: Duration,
    ) -> Result<Duration, ThrottleError> {
        let path = self.state_path(identity);
        let waited =
            run_blocking(identity, move || wait_turn_blocking(&path, min_interval)).await?;

        if waited >= LONG_WAIT_WARNING_THRESHOLD {
            warn!(
                waited_secs = waited.as_secs(),
                "long throttle wait - many processes are calling this service"
            );
        } else if !waited.is_zero() {
            debug!(waited_ms = waited.as_millis(), "throttle delay applied");
        }
        Ok(waited)
    }

    /// Records "now" as the last call for `identity` without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError`] on state file failures.
    #[instrument(skip(self), fields(identity = %identity))]
    pub async fn record_call(&self, identity: &ThrottleIdentity) -> Result<(), ThrottleError> {
        let path = self.state_path(identity);
        run_blocking(identity, move || {
            let mut file = open_locked(&path)?;
            write_timestamp(&mut file, epoch_millis_ceil()).map_err(|e| ThrottleError::io(&path, e))?;
            release(&file, &path)
        })
        .await
    }

    /// Reads the last recorded call (epoch milliseconds) for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError`] on state file failures.
    pub async fn last_call(&self, identity: &ThrottleIdentity) -> Result<Option<u64>, ThrottleError> {
        let path = self.state_path(identity);
        if !path.exists() {
            return Ok(None);
        }
        run_blocking(identity, move || {
            let mut file = open_locked(&path)?;
            let last = read_timestamp(&mut file).map_err(|e| ThrottleError::io(&path, e))?;
            release(&file, &path)?;
            Ok((last > 0).then_some(last))
        })
        .await
    }

    /// Removes state files idle for at least `older_than`.
    ///
    /// Files currently locked by someone else are skipped. Only removes files
    /// on Unix, where a waiter can detect that its lock file was unlinked and
    /// reopen; elsewhere this is a no-op. Returns the number of files removed.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError`] if the state directory cannot be listed.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub async fn prune_idle(&self, older_than: Duration) -> Result<usize, ThrottleError> {
        let dir = self.dir.clone();
        let identity = ThrottleIdentity(String::from("prune"));
        let removed = run_blocking(&identity, move || prune_idle_blocking(&dir, older_than)).await?;
        if removed > 0 {
            debug!(removed, "pruned idle throttle records");
        }
        Ok(removed)
    }
}

async fn run_blocking<T, F>(identity: &ThrottleIdentity, work: F) -> Result<T, ThrottleError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ThrottleError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ThrottleError::Worker {
            identity: identity.to_string(),
            message: e.to_string(),
        })?
}

fn wait_turn_blocking(path: &Path, min_interval: Duration) -> Result<Duration, ThrottleError> {
    let mut file = open_locked(path)?;
    let last = read_timestamp(&mut file).map_err(|e| ThrottleError::io(path, e))?;

    // Timestamps are written rounded up, so this never overstates the gap.
    let elapsed = epoch_now().saturating_sub(Duration::from_millis(last));
    let wait = min_interval.saturating_sub(elapsed);
    if !wait.is_zero() {
        std::thread::sleep(wait);
    }

    // Written before the lock is released: the next acquirer sees this call.
    write_timestamp(&mut file, epoch_millis_ceil()).map_err(|e| ThrottleError::io(path, e))?;
    release(&file, path)?;
    Ok(wait)
}

/// Opens and exclusively locks the state file, reopening if it was pruned
/// between open and lock.
fn open_locked(path: &Path) -> Result<File, ThrottleError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ThrottleError::io(parent, e))?;
    }
    loop {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| ThrottleError::io(path, e))?;
        file.lock_exclusive().map_err(|e| ThrottleError::io(path, e))?;
        if still_linked(&file, path) {
            return Ok(file);
        }
        debug!(path = %path.display(), "state file pruned while waiting for lock, reopening");
        let _ = FileExt::unlock(&file);
    }
}

fn release(file: &File, path: &Path) -> Result<(), ThrottleError> {
    FileExt::unlock(file).map_err(|e| ThrottleError::io(path, e))
}

#[cfg(unix)]
fn still_linked(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), fs::metadata(path)) {
        (Ok(held), Ok(current)) => held.dev() == current.dev() && held.ino() == current.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn still_linked(_file: &File, _path: &Path) -> bool {
    true
}

/// Reads the stored timestamp; absent or unreadable content counts as 0.
fn read_timestamp(file: &mut File) -> std::io::Result<u64> {
    file.seek(SeekFrom::Start(0))?;
    let mut raw = String::new();
    file.read_to_string(&mut raw)?;
    Ok(raw.trim().parse().unwrap_or(0))
}

fn write_timestamp(file: &mut File, epoch_millis: u64) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(format!("{epoch_millis}\n").as_bytes())?;
    file.flush()
}

fn epoch_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
}

#[allow(clippy::cast_possible_truncation)]
fn epoch_millis_ceil() -> u64 {
    let now = epoch_now();
    let millis = now.as_millis() as u64;
    if now.subsec_nanos() % 1_000_000 == 0 {
        millis
    } else {
        millis + 1
    }
}

fn prune_idle_blocking(dir: &Path, older_than: Duration) -> Result<usize, ThrottleError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(ThrottleError::io(dir, e)),
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(OsStr::to_str) != Some(STATE_EXTENSION) {
            continue;
        }
        if remove_if_idle(&path, older_than) {
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(unix)]
fn remove_if_idle(path: &Path, older_than: Duration) -> bool {
    let Ok(mut file) = OpenOptions::new().read(true).write(true).open(path) else {
        return false;
    };
    if file.try_lock_exclusive().is_err() {
        // In use right now, so not idle.
        return false;
    }

    let idle = still_linked(&file, path)
        && read_timestamp(&mut file).is_ok_and(|last| {
            epoch_now().saturating_sub(Duration::from_millis(last)) >= older_than
        });
    let removed = idle && fs::remove_file(path).is_ok();
    let _ = FileExt::unlock(&file);
    removed
}

#[cfg(not(unix))]
fn remove_if_idle(_path: &Path, _older_than: Duration) -> bool {
    false
}
