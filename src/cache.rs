//! Time-bounded memoisation shared across requests.

use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// Concurrent key/value cache whose entries expire `ttl` after insertion.
///
/// Expired entries are evicted lazily on lookup, and every [`PURGE_INTERVAL`]
/// inserts a full sweep drops expired entries for all keys.
/// Instances are meant to be wrapped in an `Arc` and injected, so tests can hand
/// a component a fresh or pre-populated cache.
pub struct TtlCache<K, V> {
    entries: DashMap<K, Entry<V>>,
    ttl: Duration,
    inserts: AtomicUsize,
}

/// Inserts between full sweeps of expired entries.
pub const PURGE_INTERVAL: usize = 64;

struct Entry<V> {
    value: V,
    inserted: Instant,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            inserts: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(entry) = self.entries.get(key)
            && entry.inserted.elapsed() < self.ttl
        {
            return Some(entry.value.clone());
        }
        self.entries
            .remove_if(key, |_, entry| entry.inserted.elapsed() >= self.ttl);
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            Entry {
                value,
                inserted: Instant::now(),
            },
        );
        if (self.inserts.fetch_add(1, Ordering::Relaxed) + 1) % PURGE_INTERVAL == 0 {
            self.purge_expired();
        }
    }

    /// Returns the cached value for `key`, or runs `compute` and caches its
    /// `Ok` output. Errors are returned as-is and never cached.
    ///
    /// No lock is held while `compute` runs, so two concurrent misses on the
    /// same key may both compute; the later insert wins.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let value = compute().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.inserted.elapsed() < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
