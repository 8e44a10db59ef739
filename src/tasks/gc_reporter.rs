//! GC Error Reporter Task
//!
//! Background task that drains the file cache's garbage collection error
//! slot into the log. Sweeps themselves are started by cache traffic.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::codec::Codec;
use crate::file::FileCache;

/// Spawns a background task that periodically reports gc failures.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between checks. Only the first error of a failing period is retained by
/// the cache, so at most one warning is logged per check.
///
/// # Arguments
/// * `cache` - shared reference to the file cache
/// * `interval_secs` - Interval in seconds between checks
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(FileCache::new(FileCacheOptions::new("./cache-data"), RawCodec)?);
/// let reporter = spawn_gc_reporter(cache.clone(), 60);
/// // Later, during shutdown:
/// reporter.abort();
/// ```
pub fn spawn_gc_reporter<V, C>(cache: Arc<FileCache<V, C>>, interval_secs: u64) -> JoinHandle<()>
where
    V: Send + 'static,
    C: Codec<V> + 'static,
{
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            root = %cache.root().display(),
            "Starting gc reporter with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            match cache.take_gc_error() {
                Some(err) => warn!(root = %cache.root().display(), error = %err, "gc sweep failed"),
                None => debug!("gc reporter: no errors pending"),
            }
        }
    })
}
