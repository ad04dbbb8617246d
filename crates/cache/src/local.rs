//! In-process TTL cache backed by DashMap for lock-free concurrent access.
//! Constructed once at process start and handed to whoever needs it; there
//! is no module-level cache state.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Bounded cache with per-entry expiry.
pub struct LocalCache<K, V> {
    store: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
    max_entries: usize,
    name: &'static str,
}

impl<K, V> LocalCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration, max_entries: usize) -> Self {
        Self {
            store: DashMap::with_capacity(max_entries.min(1024)),
            ttl,
            max_entries,
            name,
        }
    }

    /// Get a value, returns None if expired or missing.
    pub fn get(&self, key: &K) -> Option<V> {
        let Some(entry) = self.store.get(key) else {
            metrics::counter!("cache.misses", "cache" => self.name).increment(1);
            return None;
        };
        if entry.inserted_at.elapsed() > self.ttl {
            drop(entry);
            self.store.remove(key);
            metrics::counter!("cache.expired", "cache" => self.name).increment(1);
            return None;
        }
        metrics::counter!("cache.hits", "cache" => self.name).increment(1);
        Some(entry.value.clone())
    }

    /// Insert or update a value.
    pub fn put(&self, key: K, value: V) {
        if self.store.len() >= self.max_entries && !self.store.contains_key(&key) {
            // Full: try to reclaim expired slots before giving up on the insert.
            if self.evict_expired() == 0 {
                return;
            }
        }
        self.store.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Return the cached value or compute, store and return it.
    pub fn get_or_insert_with<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let value = compute();
        self.put(key, value.clone());
        value
    }

    pub fn invalidate(&self, key: &K) {
        self.store.remove(key);
    }

    /// Remove expired entries. Call this periodically from a background task.
    pub fn evict_expired(&self) -> usize {
        // Counted per entry; concurrent puts may change len() meanwhile.
        let mut removed = 0;
        self.store.retain(|_, entry| {
            let live = entry.inserted_at.elapsed() <= self.ttl;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
