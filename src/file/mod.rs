//! File Cache Module
//!
//! Disk-persisted cache with sharded paths, atomic write-then-rename and a
//! self-triggered background garbage collector.
//!
//! No in-process lock orders operations on the same key. Writes become
//! visible through a single rename, so a reader sees either the previous file
//! or the new one, never a partial write. Concurrent writers to one key race
//! and the last rename wins. The root directory is assumed to belong to this
//! cache alone.

mod format;
mod gc;
mod path;

use std::fmt::Display;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::Builder;
use tracing::{debug, info};

use crate::cache::Cache;
use crate::codec::Codec;
use crate::context::Context;
use crate::error::{CacheError, Result};

pub use format::Header;
pub use gc::Collector;
pub use path::{cache_path, is_cache_file, CACHE_FILE_EXTENSION};

/// Interval used when none, or one below [`MIN_GC_INTERVAL`], is configured.
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(300);

/// Smallest accepted GC interval.
pub const MIN_GC_INTERVAL: Duration = Duration::from_secs(1);

// == Options ==
/// Construction parameters for a [`FileCache`].
#[derive(Debug, Clone)]
pub struct FileCacheOptions {
    /// Root directory; created if missing
    pub root: PathBuf,
    /// Minimum time between background sweeps
    pub gc_interval: Option<Duration>,
}

impl FileCacheOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            gc_interval: None,
        }
    }

    pub fn gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval = Some(interval);
        self
    }

    /// The interval actually used: sub-second or missing values fall back
    /// to [`DEFAULT_GC_INTERVAL`].
    pub fn effective_gc_interval(&self) -> Duration {
        match self.gc_interval {
            Some(interval) if interval >= MIN_GC_INTERVAL => interval,
            _ => DEFAULT_GC_INTERVAL,
        }
    }
}

// == File Cache ==
/// Cache storing each entry as one file under a root directory.
pub struct FileCache<V, C> {
    root: PathBuf,
    codec: C,
    collector: Arc<Collector>,
    _value: PhantomData<fn() -> V>,
}

impl<V, C> std::fmt::Debug for FileCache<V, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCache")
            .field("root", &self.root)
            .field("gc_interval", &self.collector.interval())
            .finish()
    }
}

impl<V, C> FileCache<V, C>
where
    C: Codec<V>,
{
    // == Constructor ==
    /// Opens a cache rooted at `options.root`, creating the directory.
    pub fn new(options: FileCacheOptions, codec: C) -> Result<Self> {
        let interval = options.effective_gc_interval();
        std::fs::create_dir_all(&options.root)
            .map_err(|e| CacheError::io(&options.root, e))?;

        info!(
            root = %options.root.display(),
            gc_interval_secs = interval.as_secs(),
            "file cache opened"
        );

        Ok(Self {
            collector: Arc::new(Collector::new(options.root.clone(), interval)),
            root: options.root,
            codec,
            _value: PhantomData,
        })
    }

    // == Accessors ==
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn gc_interval(&self) -> Duration {
        self.collector.interval()
    }

    /// Returns the file a key is stored in.
    pub fn path_for(&self, key: &impl Display) -> PathBuf {
        cache_path(&self.root, &key.to_string())
    }

    // == Garbage Collection ==
    /// Runs a sweep now, off the async executor.
    ///
    /// Returns the number of files removed, or `None` if a sweep was already
    /// in flight.
    pub async fn collect_garbage(&self) -> Result<Option<usize>> {
        let collector = Arc::clone(&self.collector);
        tokio::task::spawn_blocking(move || collector.run())
            .await
            .map_err(|e| CacheError::Internal(format!("gc task failed: {e}")))
    }

    /// Takes the pending background gc error, if any.
    pub fn take_gc_error(&self) -> Option<CacheError> {
        self.collector.take_error()
    }

    fn maybe_collect(&self) {
        if self.collector.maybe_trigger() {
            debug!(root = %self.root.display(), "gc sweep triggered");
        }
    }

    // == Read ==
    async fn read(&self, key: &str) -> Result<V> {
        let path = cache_path(&self.root, key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CacheError::NotFound(key.to_string()))
            }
            Err(e) => return Err(CacheError::io(&path, e)),
        };

        let (header, payload_start) = format::decode(&path, &bytes)?;
        if header.is_expired() {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                debug!(path = %path.display(), error = %e, "failed to remove expired cache file");
            }
            return Err(CacheError::NotFound(key.to_string()));
        }

        self.codec.decode(&bytes[payload_start..])
    }

    // == Write ==
    async fn write(&self, key: &str, value: &V, ttl: Duration) -> Result<()> {
        let path = cache_path(&self.root, key);
        let payload = self.codec.encode(value)?;
        let ttl_nanos = i64::try_from(ttl.as_nanos()).unwrap_or(i64::MAX);
        let header = Header::new(ttl_nanos);

        tokio::task::spawn_blocking(move || write_atomic(&path, &header, &payload))
            .await
            .map_err(|e| CacheError::Internal(format!("write task failed: {e}")))?
    }

    // == Remove ==
    async fn remove(&self, key: &str) -> Result<()> {
        let path = cache_path(&self.root, key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }
}

/// Writes header and payload to a temp file next to `path`, syncs it and
/// renames it into place. On any failure the temp file is discarded and
/// `path` is left as it was.
fn write_atomic(path: &Path, header: &Header, payload: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| CacheError::Internal(format!("{} has no parent", path.display())))?;
    std::fs::create_dir_all(dir).map_err(|e| CacheError::io(dir, e))?;

    let mut tmp = Builder::new()
        .prefix(".tmp-")
        .suffix(".partial")
        .tempfile_in(dir)
        .map_err(|e| CacheError::io(dir, e))?;

    let tmp_path = tmp.path().to_path_buf();
    write_contents(tmp.as_file_mut(), header, payload)
        .map_err(|e| CacheError::io(&tmp_path, e))?;

    tmp.persist(path)
        .map_err(|e| CacheError::io(path, e.error))?;
    Ok(())
}

fn write_contents(file: &mut File, header: &Header, payload: &[u8]) -> std::io::Result<()> {
    file.write_all(&header.encode())?;
    file.write_all(payload)?;
    file.flush()?;
    file.sync_all()
}

// == Cache Contract ==
#[async_trait]
impl<K, V, C> Cache<K, V> for FileCache<V, C>
where
    K: Display + Send + Sync + 'static,
    V: Send + Sync + 'static,
    C: Codec<V> + 'static,
{
    async fn get(&self, ctx: &Context, key: &K) -> Result<V> {
        ctx.check()?;
        let result = self.read(&key.to_string()).await;
        self.maybe_collect();
        result
    }

    async fn set(&self, ctx: &Context, key: K, value: V, ttl: Duration) -> Result<()> {
        ctx.check()?;
        let key = key.to_string();
        let result = self.write(&key, &value, ttl).await;
        if result.is_ok() {
            debug!(key = %key, "cache file written");
        }
        self.maybe_collect();
        result
    }

    async fn delete(&self, ctx: &Context, keys: &[K]) -> Result<()> {
        ctx.check()?;
        let mut errors = Vec::new();
        for key in keys {
            if let Err(e) = self.remove(&key.to_string()).await {
                errors.push(e);
            }
        }
        CacheError::aggregate(errors)
    }
}
