//! Cache Entry Module
//!
//! Defines a single cached value together with its access bookkeeping.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// Expiry is anchored to `created_at`: reads refresh `last_accessed_at`
/// but never push the expiry point back.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The stored value
    pub value: T,
    /// Set on insertion or overwrite, never touched by reads
    pub created_at: Instant,
    /// Updated on every successful read
    pub last_accessed_at: Instant,
    /// Number of successful reads, starting at 1 on insertion
    pub access_count: u64,
    /// Time to live measured from `created_at`
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a fresh entry stamped with the current time.
    pub fn new(value: T, ttl: Duration) -> Self {
        let now = Instant::now();

        Self {
            value,
            created_at: now,
            last_accessed_at: now,
            access_count: 1,
            ttl,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once strictly more than `ttl` has elapsed since
    /// it was created.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Same as [`is_expired`](Self::is_expired) against an explicit instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&mut self) {
        self.last_accessed_at = Instant::now();
        self.access_count += 1;
    }

    // == Age ==
    /// Time elapsed since the entry was created or last overwritten.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, `Duration::ZERO` once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.age())
    }
}
