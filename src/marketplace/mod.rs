//! Marketplace Module
//!
//! Domain records, the backing-store boundary, the partition stores and the
//! cached data-access layer built on top of them.

mod partitions;
mod repository;
mod source;
mod types;

pub use partitions::{MarketplaceCaches, Partition, PartitionSettings};
pub use repository::CachedMarketplace;
pub use source::{Catalog, InMemorySource, MarketplaceSource, SourceResult};
pub use types::{
    Business, CustomerOrderStats, Entity, Keyed, Order, OrderData, OrderItem, Product, Role,
    Stall, User,
};
