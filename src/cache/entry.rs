//! Cache Entry Module
//!
//! Defines the structure for individual in-memory cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single LRU entry: the key it is indexed under, its value and the
/// instant after which it is logically absent.
#[derive(Debug, Clone)]
pub struct CacheEntry<K, V> {
    /// The key, kept so an evicted entry can be dropped from the index
    pub key: K,
    /// The stored value
    pub value: V,
    /// Absolute expiry instant
    pub expire_at: Instant,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructor ==
    /// Creates a new entry that expires `ttl` from now.
    pub fn new(key: K, value: V, ttl: Duration) -> Self {
        Self {
            key,
            value,
            expire_at: expire_instant(ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiry instant,
    /// so a zero TTL is already expired on the next read.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Checks expiry against a caller-supplied clock reading.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expire_at
    }

    // == Time To Live ==
    /// Returns the time left before expiry, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expire_at.saturating_duration_since(Instant::now())
    }

    /// Replaces value and expiry in place.
    pub fn refresh(&mut self, value: V, ttl: Duration) {
        self.value = value;
        self.expire_at = expire_instant(ttl);
    }
}

// == Utility Functions ==
/// Computes now + ttl, saturating far in the future on overflow.
fn expire_instant(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl)
        .unwrap_or_else(|| now + Duration::from_secs(100 * 365 * 24 * 60 * 60))
}
