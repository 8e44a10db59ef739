//! Background garbage collection for the file cache.
//!
//! Foreground calls invoke [`Collector::maybe_trigger`] after their own work.
//! At most one caller per interval wins the trigger (CAS on the last-trigger
//! timestamp) and at most one sweep runs at a time (CAS on the running flag).
//! Sweep failures go to a single-slot channel: the first unread error is kept,
//! later ones are dropped.

use std::fs::{self, File};
use std::io::ErrorKind;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{CacheError, Result};
use crate::file::format::{now_nanos, read_expiry};
use crate::file::path::is_cache_file;

// == Collector ==
/// Shared GC state for one file cache root.
#[derive(Debug)]
pub struct Collector {
    root: PathBuf,
    interval: Duration,
    /// Unix seconds of the last trigger
    last_trigger: AtomicI64,
    running: AtomicBool,
    errors_tx: mpsc::Sender<CacheError>,
    errors_rx: Mutex<mpsc::Receiver<CacheError>>,
}

/// Clears the running flag when a sweep ends, panicking or not.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Collector {
    /// Creates a collector whose first sweep is due one interval from now.
    pub fn new(root: PathBuf, interval: Duration) -> Self {
        let (errors_tx, errors_rx) = mpsc::channel(1);
        Self {
            root,
            interval,
            last_trigger: AtomicI64::new(Utc::now().timestamp()),
            running: AtomicBool::new(false),
            errors_tx,
            errors_rx: Mutex::new(errors_rx),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts a detached sweep if the interval has elapsed since the last
    /// trigger and this caller wins the race to claim it.
    ///
    /// Never blocks. Returns true if a sweep was launched.
    pub fn maybe_trigger(self: &Arc<Self>) -> bool {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no tokio runtime available, skipping gc sweep");
            return false;
        };

        let now = Utc::now().timestamp();
        let last = self.last_trigger.load(Ordering::Acquire);
        let interval = i64::try_from(self.interval.as_secs()).unwrap_or(i64::MAX);

        if now.saturating_sub(last) < interval {
            return false;
        }
        if self
            .last_trigger
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let collector = Arc::clone(self);
        handle.spawn_blocking(move || {
            collector.run();
        });
        true
    }

    /// Runs one sweep on the calling thread.
    ///
    /// Returns the number of files removed, or `None` if another sweep was
    /// already in flight. Panics inside the sweep are caught and reported
    /// through the error slot.
    pub fn run(&self) -> Option<usize> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(root = %self.root.display(), "gc sweep already running");
            return None;
        }
        let _guard = RunningGuard(&self.running);

        match panic::catch_unwind(AssertUnwindSafe(|| self.sweep())) {
            Ok(removed) => {
                if removed > 0 {
                    info!(root = %self.root.display(), removed, "gc sweep removed expired cache files");
                } else {
                    debug!(root = %self.root.display(), "gc sweep found no expired cache files");
                }
                Some(removed)
            }
            Err(_) => {
                self.report(CacheError::Internal("gc sweep panicked".to_string()));
                Some(0)
            }
        }
    }

    /// Walks the whole root and deletes expired cache files.
    fn sweep(&self) -> usize {
        let now = now_nanos();
        let mut removed = 0;

        for entry in WalkDir::new(&self.root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(&self.root).to_path_buf();
                    self.report(CacheError::io(path, err.into()));
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !is_cache_file(path) {
                continue;
            }

            match remove_if_expired(path, now) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(err) => self.report(err),
            }
        }

        removed
    }

    /// Offers an error to the slot; dropped if the slot is full.
    fn report(&self, err: CacheError) {
        warn!(error = %err, "file cache gc error");
        let _ = self.errors_tx.try_send(err);
    }

    /// Takes the pending gc error, if any.
    pub fn take_error(&self) -> Option<CacheError> {
        self.errors_rx.lock().try_recv().ok()
    }
}

/// Deletes `path` if its header says it has expired by `now`.
fn remove_if_expired(path: &Path, now: i64) -> Result<bool> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(CacheError::io(path, e)),
    };

    let expire_at = read_expiry(path, file)?;
    if now < expire_at {
        return Ok(false);
    }

    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::format::Header;
    use tempfile::TempDir;

    fn write_file(path: &Path, expire_at: i64) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut bytes = Header {
            expire_at,
            created_at: 0,
        }
        .encode();
        bytes.extend_from_slice(b"payload");
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_sweep_removes_only_expired_cache_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let now = now_nanos();

        let expired = root.join("aa/bb/cc/old.cache");
        let live = root.join("aa/bb/dd/new.cache");
        let other = root.join("aa/notes.txt");
        let partial = root.join("aa/bb/cc/.tmp-123.partial");
        write_file(&expired, now - 1);
        write_file(&live, now + 60_000_000_000);
        write_file(&other, now - 1);
        fs::write(&partial, b"etime=0\n").unwrap();

        let collector = Collector::new(root.to_path_buf(), Duration::from_secs(300));
        assert_eq!(collector.run(), Some(1));

        assert!(!expired.exists());
        assert!(live.exists());
        assert!(other.exists());
        assert!(partial.exists());
        assert!(collector.take_error().is_none());
    }

    #[test]
    fn test_sweep_reports_corrupt_file_and_continues() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        let corrupt = root.join("aa/bad.cache");
        let expired = root.join("bb/old.cache");
        fs::create_dir_all(corrupt.parent().unwrap()).unwrap();
        fs::write(&corrupt, b"garbage").unwrap();
        write_file(&expired, 0);

        let collector = Collector::new(root.to_path_buf(), Duration::from_secs(300));
        assert_eq!(collector.run(), Some(1));

        assert!(corrupt.exists());
        assert!(!expired.exists());
        assert!(matches!(
            collector.take_error(),
            Some(CacheError::Corrupt { .. })
        ));
        assert!(collector.take_error().is_none());
    }

    #[test]
    fn test_error_slot_keeps_first_and_drops_rest() {
        let dir = TempDir::new().unwrap();
        let collector = Collector::new(dir.path().to_path_buf(), Duration::from_secs(300));

        collector.report(CacheError::Internal("first".into()));
        collector.report(CacheError::Internal("second".into()));

        assert!(matches!(
            collector.take_error(),
            Some(CacheError::Internal(msg)) if msg == "first"
        ));
        assert!(collector.take_error().is_none());
    }

    #[test]
    fn test_run_is_single_flight() {
        let dir = TempDir::new().unwrap();
        let collector = Collector::new(dir.path().to_path_buf(), Duration::from_secs(300));

        collector.running.store(true, Ordering::Release);
        assert_eq!(collector.run(), None);

        collector.running.store(false, Ordering::Release);
        assert_eq!(collector.run(), Some(0));
        assert!(!collector.running.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_trigger_waits_for_interval() {
        let dir = TempDir::new().unwrap();
        let collector = Arc::new(Collector::new(
            dir.path().to_path_buf(),
            Duration::from_secs(300),
        ));

        assert!(!collector.maybe_trigger());
    }

    #[test]
    fn test_trigger_without_runtime_keeps_the_slot() {
        let dir = TempDir::new().unwrap();
        let collector = Arc::new(Collector::new(
            dir.path().to_path_buf(),
            Duration::from_secs(300),
        ));
        collector.last_trigger.store(0, Ordering::Release);

        assert!(!collector.maybe_trigger());
        assert_eq!(collector.last_trigger.load(Ordering::Acquire), 0);

        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        assert!(rt.block_on(async { collector.maybe_trigger() }));
    }

    #[tokio::test]
    async fn test_trigger_claims_once_per_interval() {
        let dir = TempDir::new().unwrap();
        let collector = Arc::new(Collector::new(
            dir.path().to_path_buf(),
            Duration::from_secs(300),
        ));
        collector.last_trigger.store(0, Ordering::Release);

        assert!(collector.maybe_trigger());
        assert!(!collector.maybe_trigger());
    }
}
