//! Cache Module
//!
//! The shared cache contract and its in-process implementations.

mod entry;
mod lru;
mod null;
mod stats;
mod store;


use std::time::Duration;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Result;

// Re-export public types
pub use entry::CacheEntry;
pub use lru::RecencyList;
pub use null::NullCache;
pub use stats::CacheStats;
pub use store::LruCache;

// == Cache Contract ==
/// Uniform key-value cache interface.
///
/// Every implementation checks `ctx` before doing any work and fails with
/// its cancellation cause if it is already done.
#[async_trait]
pub trait Cache<K, V>: Send + Sync
where
    K: Send + Sync + 'static,
    V: Send + 'static,
{
    /// Returns the stored value, or `CacheError::NotFound` when the key is
    /// absent or its entry has expired.
    async fn get(&self, ctx: &Context, key: &K) -> Result<V>;

    /// Stores `value` until `ttl` from now, replacing any existing entry.
    async fn set(&self, ctx: &Context, key: K, value: V, ttl: Duration) -> Result<()>;

    /// Removes every key in `keys`. Missing keys are not an error.
    async fn delete(&self, ctx: &Context, keys: &[K]) -> Result<()>;
}
