//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and TTL expiration.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStats, LruTracker};

// == Cache Store ==
/// Bounded key-value storage with LRU eviction and TTL expiry.
///
/// Every operation is a total function over the store's state: nothing here
/// can fail. Expired entries are dropped lazily by `get`/`has` and eagerly
/// by `cleanup`.
#[derive(Debug)]
pub struct CacheStore<T> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<T>>,
    /// Recency order used to pick eviction victims
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of resident entries
    capacity: usize,
    /// TTL applied when `set` gets no explicit one
    default_ttl: Duration,
}

impl<T> CacheStore<T> {
    // == Constructor ==
    /// Creates a new store with the given capacity and default TTL.
    ///
    /// A capacity of zero could never hold the entry being inserted, so it
    /// is raised to one.
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        let capacity = if capacity == 0 {
            warn!("Cache capacity of 0 requested, using 1");
            1
        } else {
            capacity
        };

        Self {
            entries: HashMap::with_capacity(capacity),
            lru: LruTracker::with_capacity(capacity),
            stats: CacheStats::new(),
            capacity,
            default_ttl,
        }
    }

    // == Set ==
    /// Stores a value, replacing any previous entry under the same key.
    ///
    /// An overwrite produces a brand new entry: the TTL clock restarts and
    /// the access count goes back to 1. When a new key arrives at a full
    /// store, the least recently used entry is evicted first.
    pub fn set(&mut self, key: impl Into<String>, value: T, ttl: Option<Duration>) {
        let key = key.into();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_lru();
        }

        let entry = CacheEntry::new(value, ttl.unwrap_or(self.default_ttl));
        self.lru.touch(&key);
        self.entries.insert(key, entry);
    }

    // == Has ==
    /// Checks for a live entry.
    ///
    /// Drops the entry if it has expired, but otherwise leaves stats,
    /// access metadata and recency untouched.
    pub fn has(&mut self, key: &str) -> bool {
        self.live_entry_mut(key).is_some()
    }

    // == Delete ==
    /// Removes an entry by key, returning whether anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key)
    }

    // == Clear ==
    /// Removes every entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries and returns how many were removed.
    pub fn cleanup(&mut self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove_entry(key);
        }

        expired.len()
    }

    // == Peek ==
    /// Returns a live entry without recording an access.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry<T>> {
        self.entries.get(key).filter(|entry| !entry.is_expired())
    }

    // == Stats ==
    /// Returns a snapshot of the store's statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Returns the resident keys, expired-but-not-yet-collected ones included.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Internals ==
    fn live_entry_mut(&mut self, key: &str) -> Option<&mut CacheEntry<T>> {
        if self.entries.get(key)?.is_expired() {
            self.remove_entry(key);
            return None;
        }
        self.entries.get_mut(key)
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            true
        } else {
            false
        }
    }

    fn evict_lru(&mut self) {
        if let Some(victim) = self.lru.evict_oldest() {
            self.entries.remove(&victim);
            self.stats.record_eviction();
            debug!(key = %victim, "Evicted least recently used entry");
        }
    }
}

impl<T: Clone> CacheStore<T> {
    // == Get ==
    /// Retrieves a value by key.
    ///
    /// A hit refreshes the entry's access metadata and recency. Missing and
    /// expired keys count as misses; expired entries are removed.
    pub fn get(&mut self, key: &str) -> Option<T> {
        let Some(entry) = self.live_entry_mut(key) else {
            self.stats.record_miss();
            return None;
        };

        entry.touch();
        let value = entry.value.clone();
        self.lru.touch(key);
        self.stats.record_hit();
        Some(value)
    }
}
