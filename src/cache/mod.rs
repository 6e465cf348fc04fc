//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and LRU eviction.
//!
//! [`CacheStore`] is the single-threaded engine; [`SharedCache`] is the
//! cloneable handle the rest of the application holds, one per partition.

mod entry;
mod lru;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use shared::{CacheHandle, SharedCache};
pub use stats::CacheStats;
pub use store::CacheStore;
