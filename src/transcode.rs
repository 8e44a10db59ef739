//! Transcoding Cache Module
//!
//! Typed view over a cache that stores encoded strings.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::Cache;
use crate::codec::Codec;
use crate::context::Context;
use crate::error::{CacheError, Result};

/// Exposes `Cache<String, V>` on top of a `Cache<String, String>`.
///
/// Values are encoded with `C` on the way in and decoded on the way out.
/// Concurrency and expiry are entirely the wrapped cache's business.
pub struct TranscodingCache<V, C> {
    inner: Arc<dyn Cache<String, String>>,
    codec: C,
    _value: PhantomData<fn() -> V>,
}

impl<V, C> TranscodingCache<V, C>
where
    C: Codec<V>,
{
    pub fn new(inner: Arc<dyn Cache<String, String>>, codec: C) -> Self {
        Self {
            inner,
            codec,
            _value: PhantomData,
        }
    }

    /// Returns the wrapped string cache.
    pub fn inner(&self) -> &Arc<dyn Cache<String, String>> {
        &self.inner
    }
}

#[async_trait]
impl<V, C> Cache<String, V> for TranscodingCache<V, C>
where
    V: Send + Sync + 'static,
    C: Codec<V> + 'static,
{
    async fn get(&self, ctx: &Context, key: &String) -> Result<V> {
        let raw = self.inner.get(ctx, key).await?;
        self.codec.decode(raw.as_bytes())
    }

    async fn set(&self, ctx: &Context, key: String, value: V, ttl: Duration) -> Result<()> {
        ctx.check()?;
        let bytes = self.codec.encode(&value)?;
        let raw = String::from_utf8(bytes).map_err(CacheError::codec)?;
        self.inner.set(ctx, key, raw, ttl).await
    }

    async fn delete(&self, ctx: &Context, keys: &[String]) -> Result<()> {
        self.inner.delete(ctx, keys).await
    }
}
