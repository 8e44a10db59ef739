//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use tracing::debug;

use crate::cache::{Cache, LruCache, NullCache};
use crate::codec::{JsonCodec, RawCodec};
use crate::config::{Backend, Config};
use crate::context::Context;
use crate::error::{CacheError, Result};
use crate::file::{FileCache, FileCacheOptions};
use crate::models::{
    DeleteRequest, DeleteResponse, GetResponse, HealthResponse, SetRequest, SetResponse,
    StatsResponse,
};
use crate::transcode::TranscodingCache;

/// Application state shared across all handlers.
///
/// Handlers talk to `cache`, a JSON view over whichever string cache the
/// server was started with. The concrete backend handles are kept for the
/// endpoints and tasks that need more than the cache contract.
#[derive(Clone)]
pub struct AppState {
    /// JSON-valued cache used by the handlers
    pub cache: Arc<dyn Cache<String, Value>>,
    /// Backend name
    pub backend: Backend,
    /// Set when running on the memory backend
    pub memory: Option<Arc<LruCache<String, String>>>,
    /// Set when running on the file backend
    pub file: Option<Arc<FileCache<String, RawCodec>>>,
    /// TTL for SET requests that carry none
    pub default_ttl: Duration,
    /// Deadline given to each request
    pub request_timeout: Duration,
}

impl AppState {
    fn new(backend: Backend, raw: Arc<dyn Cache<String, String>>) -> Self {
        let defaults = Config::default();
        Self {
            cache: Arc::new(TranscodingCache::<Value, _>::new(raw, JsonCodec)),
            backend,
            memory: None,
            file: None,
            default_ttl: defaults.default_ttl(),
            request_timeout: defaults.request_timeout(),
        }
    }

    /// State backed by an in-memory LRU of `max_entries`.
    pub fn with_memory(max_entries: usize) -> Self {
        let lru: Arc<LruCache<String, String>> = Arc::new(LruCache::new(max_entries));
        Self {
            memory: Some(Arc::clone(&lru)),
            ..Self::new(Backend::Memory, lru)
        }
    }

    /// State backed by a file cache.
    pub fn with_file(options: FileCacheOptions) -> Result<Self> {
        let file: Arc<FileCache<String, RawCodec>> = Arc::new(FileCache::new(options, RawCodec)?);
        Ok(Self {
            file: Some(Arc::clone(&file)),
            ..Self::new(Backend::File, file)
        })
    }

    /// State with caching disabled.
    pub fn with_null() -> Self {
        Self::new(Backend::Null, Arc::new(NullCache::new()))
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let state = match config.backend {
            Backend::Memory => Self::with_memory(config.max_entries),
            Backend::File => Self::with_file(
                FileCacheOptions::new(&config.cache_dir).gc_interval(config.gc_interval()),
            )?,
            Backend::Null => Self::with_null(),
        };
        Ok(state.with_timeouts(config.default_ttl(), config.request_timeout()))
    }

    pub fn with_timeouts(mut self, default_ttl: Duration, request_timeout: Duration) -> Self {
        self.default_ttl = default_ttl;
        self.request_timeout = request_timeout;
        self
    }

    fn context(&self) -> Context {
        Context::with_timeout(self.request_timeout)
    }
}

/// Handler for PUT /set
///
/// Stores a JSON value in the cache with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl.map(Duration::from_secs).unwrap_or(state.default_ttl);
    state
        .cache
        .set(&state.context(), req.key.clone(), req.value, ttl)
        .await?;

    debug!(key = %req.key, ttl_secs = ttl.as_secs(), "set");
    Ok(Json(SetResponse::new(req.key, ttl.as_secs())))
}

/// Handler for GET /get/:key
///
/// Retrieves a value from the cache by key.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state.cache.get(&state.context(), &key).await?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
///
/// Deletes a key from the cache. Deleting a missing key succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let keys = vec![key];
    state.cache.delete(&state.context(), &keys).await?;

    Ok(Json(DeleteResponse::new(keys)))
}

/// Handler for POST /del
///
/// Deletes a batch of keys; failures are reported together.
pub async fn delete_many_handler(
    State(state): State<AppState>,
    Json(req): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state.cache.delete(&state.context(), &req.keys).await?;

    Ok(Json(DeleteResponse::new(req.keys)))
}

/// Handler for GET /stats
///
/// Returns LRU statistics; only the memory backend tracks them.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let lru = state.memory.as_ref().ok_or_else(|| {
        CacheError::InvalidRequest(format!(
            "statistics are not tracked by the {} backend",
            state.backend
        ))
    })?;

    Ok(Json(StatsResponse::from(lru.stats())))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.backend.to_string()))
}
