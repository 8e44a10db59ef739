//! KV Cache - generic key-value caches behind one async contract
//!
//! Provides an in-memory LRU with per-entry TTL, a crash-safe file cache with
//! background garbage collection, a no-op cache, and a transcoding adapter,
//! plus a small HTTP server exposing them.

pub mod api;
pub mod cache;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod file;
pub mod models;
pub mod tasks;
pub mod transcode;

pub use api::AppState;
pub use cache::{Cache, LruCache, NullCache};
pub use codec::{Codec, JsonCodec, RawCodec};
pub use config::{Backend, Config};
pub use context::Context;
pub use error::{CacheError, Result};
pub use file::{FileCache, FileCacheOptions};
pub use tasks::spawn_gc_reporter;
pub use transcode::TranscodingCache;
