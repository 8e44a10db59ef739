//! LRU Cache Store Module
//!
//! Bounded in-memory cache combining a HashMap index with an arena recency
//! list and lazy TTL expiration.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{Cache, CacheEntry, CacheStats, RecencyList};
use crate::context::Context;
use crate::error::{CacheError, Result};

// == LRU Cache ==
/// In-memory cache with a fixed entry capacity and least-recently-used eviction.
///
/// Expiry is lazy: an expired entry is only dropped when it is read, or when
/// it reaches the back of the recency order and is evicted. Until then it
/// keeps occupying a slot, so size `capacity` for the worst case.
#[derive(Debug)]
pub struct LruCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    capacity: usize,
}

/// Index and recency order, always mutated together under one lock.
#[derive(Debug)]
struct Inner<K, V> {
    index: HashMap<K, usize>,
    order: RecencyList<K, V>,
    stats: CacheStats,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty cache holding at most `capacity` entries.
    ///
    /// # Panics
    /// A zero capacity is a misconfiguration and panics.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "LRU cache capacity must be positive, got 0");

        Self {
            inner: Mutex::new(Inner {
                index: HashMap::with_capacity(capacity),
                order: RecencyList::with_capacity(capacity),
                stats: CacheStats::new(),
            }),
            capacity,
        }
    }

    // == Lookup ==
    /// Returns a copy of the live value for `key`, refreshing its recency.
    ///
    /// An expired entry is removed on the spot and reported as a miss.
    pub fn lookup(&self, key: &K) -> Option<V> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let Some(&idx) = inner.index.get(key) else {
            inner.stats.record_miss();
            return None;
        };

        let expired = inner.order.get(idx).map_or(true, CacheEntry::is_expired);
        if expired {
            inner.index.remove(key);
            inner.order.remove(idx);
            inner.stats.record_expiration();
            inner.stats.set_total_entries(inner.index.len());
            return None;
        }

        inner.order.move_to_front(idx);
        inner.stats.record_hit();
        inner.order.get(idx).map(|entry| entry.value.clone())
    }

    // == Insert ==
    /// Stores `value` under `key` as the most recently used entry.
    ///
    /// Inserting a new key into a full cache evicts exactly one entry, the
    /// least recently used. Returns the evicted entry, if any.
    pub fn insert(&self, key: K, value: V, ttl: Duration) -> Option<CacheEntry<K, V>> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if let Some(&idx) = inner.index.get(&key) {
            if let Some(entry) = inner.order.get_mut(idx) {
                entry.refresh(value, ttl);
            }
            inner.order.move_to_front(idx);
            return None;
        }

        let idx = inner
            .order
            .push_front(CacheEntry::new(key.clone(), value, ttl));
        inner.index.insert(key, idx);

        let evicted = if inner.order.len() > self.capacity {
            let evicted = inner.order.pop_back();
            if let Some(entry) = &evicted {
                inner.index.remove(&entry.key);
                inner.stats.record_eviction();
            }
            evicted
        } else {
            None
        };

        inner.stats.set_total_entries(inner.index.len());
        evicted
    }

    // == Remove ==
    /// Removes every key in `keys`, ignoring the ones that are absent.
    ///
    /// Returns how many entries were actually removed.
    pub fn remove_all(&self, keys: &[K]) -> usize {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let mut removed = 0;
        for key in keys {
            if let Some(idx) = inner.index.remove(key) {
                inner.order.remove(idx);
                removed += 1;
            }
        }

        inner.stats.set_total_entries(inner.index.len());
        removed
    }

    // == Clear ==
    /// Drops every entry at once.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.index.clear();
        inner.order.clear();
        inner.stats.set_total_entries(0);
    }

    // == Introspection ==
    /// Returns the keys from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        let inner = self.inner.lock();
        inner.order.iter().map(|entry| entry.key.clone()).collect()
    }

    /// Returns true if `key` is held, expired or not. Does not touch recency.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().index.contains_key(key)
    }

    /// Returns the current number of entries, including unread expired ones.
    pub fn len(&self) -> usize {
        self.inner.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.index.len());
        stats
    }
}

// == Cache Contract ==
#[async_trait]
impl<K, V> Cache<K, V> for LruCache<K, V>
where
    K: Hash + Eq + Clone + Display + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, ctx: &Context, key: &K) -> Result<V> {
        ctx.check()?;
        self.lookup(key)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    async fn set(&self, ctx: &Context, key: K, value: V, ttl: Duration) -> Result<()> {
        ctx.check()?;
        if let Some(evicted) = self.insert(key, value, ttl) {
            debug!(key = %evicted.key, "evicted least recently used entry");
        }
        Ok(())
    }

    async fn delete(&self, ctx: &Context, keys: &[K]) -> Result<()> {
        ctx.check()?;
        self.remove_all(keys);
        Ok(())
    }
}
