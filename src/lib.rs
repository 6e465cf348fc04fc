//! Marketplace Cache - in-process caching for a food-ordering marketplace
//!
//! Bounded per-partition stores with TTL expiry, LRU eviction and hit-rate
//! accounting, a read-through helper that coalesces concurrent misses, a key
//! registry, and a background warmer that primes and refreshes the stores.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod keys;
pub mod marketplace;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheHandle, CacheStore, SharedCache};
pub use config::Config;
pub use marketplace::{CachedMarketplace, MarketplaceCaches, Partition};
pub use tasks::{CacheWarmer, RefreshHandle};
