//! Null Cache Module
//!
//! A cache that stores nothing, used to switch caching off.

use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::Cache;
use crate::context::Context;
use crate::error::{CacheError, Result};

/// Always misses, silently drops writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for NullCache
where
    K: Display + Send + Sync + 'static,
    V: Send + 'static,
{
    async fn get(&self, ctx: &Context, key: &K) -> Result<V> {
        ctx.check()?;
        Err(CacheError::NotFound(key.to_string()))
    }

    async fn set(&self, ctx: &Context, _key: K, _value: V, _ttl: Duration) -> Result<()> {
        ctx.check()
    }

    async fn delete(&self, ctx: &Context, _keys: &[K]) -> Result<()> {
        ctx.check()
    }
}
