//! Cache partitions
//!
//! Every domain area gets its own independently sized and TTL'd store.
//! [`MarketplaceCaches`] owns them all; it is built once at startup and
//! handed to whoever needs it.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheHandle, SharedCache};
use crate::error::UnknownPartition;
use crate::marketplace::types::{Business, Entity, OrderData, Product, Stall, User};

// == Partition ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Stalls,
    Products,
    Orders,
    Businesses,
    Users,
}

impl Partition {
    pub const ALL: [Partition; 5] = [
        Partition::Stalls,
        Partition::Products,
        Partition::Orders,
        Partition::Businesses,
        Partition::Users,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Partition::Stalls => "stalls",
            Partition::Products => "products",
            Partition::Orders => "orders",
            Partition::Businesses => "businesses",
            Partition::Users => "users",
        }
    }

    /// Compiled-in settings: catalogue data changes rarely, orders often.
    pub fn default_settings(self) -> PartitionSettings {
        let (capacity, ttl_secs) = match self {
            Partition::Stalls => (500, 600),
            Partition::Products => (2000, 600),
            Partition::Orders => (1000, 120),
            Partition::Businesses => (200, 1800),
            Partition::Users => (1000, 900),
        };
        PartitionSettings {
            capacity,
            ttl: Duration::from_secs(ttl_secs),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Partition {
    type Err = UnknownPartition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Partition::ALL
            .into_iter()
            .find(|partition| partition.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownPartition(s.to_string()))
    }
}

/// Capacity and default TTL for one partition's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSettings {
    pub capacity: usize,
    pub ttl: Duration,
}

// == Marketplace Caches ==
/// One store per partition.
#[derive(Debug, Clone)]
pub struct MarketplaceCaches {
    pub stalls: SharedCache<Entity<Stall>>,
    pub products: SharedCache<Entity<Product>>,
    pub orders: SharedCache<OrderData>,
    pub businesses: SharedCache<Entity<Business>>,
    pub users: SharedCache<User>,
}

impl MarketplaceCaches {
    /// Builds every partition with the settings `settings` picks for it.
    pub fn new(settings: impl Fn(Partition) -> PartitionSettings) -> Self {
        fn build<T>(partition: Partition, settings: PartitionSettings) -> SharedCache<T> {
            SharedCache::new(partition.as_str(), settings.capacity, settings.ttl)
        }

        Self {
            stalls: build(Partition::Stalls, settings(Partition::Stalls)),
            products: build(Partition::Products, settings(Partition::Products)),
            orders: build(Partition::Orders, settings(Partition::Orders)),
            businesses: build(Partition::Businesses, settings(Partition::Businesses)),
            users: build(Partition::Users, settings(Partition::Users)),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(Partition::default_settings)
    }

    pub fn handle(&self, partition: Partition) -> &dyn CacheHandle {
        match partition {
            Partition::Stalls => &self.stalls,
            Partition::Products => &self.products,
            Partition::Orders => &self.orders,
            Partition::Businesses => &self.businesses,
            Partition::Users => &self.users,
        }
    }

    pub fn handles(&self) -> impl Iterator<Item = (Partition, &dyn CacheHandle)> + '_ {
        Partition::ALL
            .into_iter()
            .map(move |partition| (partition, self.handle(partition)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_round_trips_through_name() {
        for partition in Partition::ALL {
            assert_eq!(partition.as_str().parse::<Partition>(), Ok(partition));
        }
        assert_eq!("STALLS".parse::<Partition>(), Ok(Partition::Stalls));
        assert_eq!(
            "pizzas".parse::<Partition>(),
            Err(UnknownPartition("pizzas".into()))
        );
    }

    #[test]
    fn test_caches_use_partition_settings() {
        let caches = MarketplaceCaches::new(|partition| match partition {
            Partition::Orders => PartitionSettings {
                capacity: 3,
                ttl: Duration::from_secs(5),
            },
            other => other.default_settings(),
        });

        let orders = caches.handle(Partition::Orders);
        assert_eq!(orders.name(), "orders");
        assert_eq!(orders.capacity(), 3);
        assert_eq!(orders.default_ttl(), Duration::from_secs(5));
        assert_eq!(caches.handle(Partition::Stalls).capacity(), 500);
    }

    #[test]
    fn test_partitions_are_independent() {
        let caches = MarketplaceCaches::with_defaults();

        caches.stalls.set("stall:1", Entity::Many(vec![]), None);
        caches.handle(Partition::Products).clear();

        assert_eq!(caches.handle(Partition::Stalls).len(), 1);
        assert_eq!(caches.handle(Partition::Products).len(), 0);
        assert_eq!(caches.handles().count(), 5);
    }
}
