//! Backing store boundary
//!
//! [`MarketplaceSource`] is everything the cache layer needs from the slow,
//! remote store. [`InMemorySource`] implements it over a local catalogue
//! with simulated latency, standing in for the remote store in the service
//! binary and in tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::RwLock;

use crate::error::SourceError;
use crate::marketplace::types::{
    Business, CustomerOrderStats, Order, OrderItem, Product, Role, Stall, User,
};

pub type SourceResult<T> = std::result::Result<T, SourceError>;

#[async_trait]
pub trait MarketplaceSource: Send + Sync {
    async fn active_stalls(&self) -> SourceResult<Vec<Stall>>;
    async fn active_products(&self) -> SourceResult<Vec<Product>>;
    async fn active_businesses(&self) -> SourceResult<Vec<Business>>;

    async fn stall(&self, id: u64) -> SourceResult<Stall>;
    async fn stalls_by_business(&self, business_id: u64) -> SourceResult<Vec<Stall>>;
    async fn products_by_stall(&self, stall_id: u64) -> SourceResult<Vec<Product>>;
    async fn order_items(&self, order_id: u64) -> SourceResult<Vec<OrderItem>>;
    async fn customer_order_stats(&self, customer_id: u64) -> SourceResult<CustomerOrderStats>;
    async fn user(&self, id: u64) -> SourceResult<User>;
}

/// Records held by an [`InMemorySource`].
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub businesses: Vec<Business>,
    pub stalls: Vec<Stall>,
    pub products: Vec<Product>,
    pub users: Vec<User>,
    pub orders: Vec<Order>,
    pub order_items: Vec<OrderItem>,
}

// == In-Memory Source ==
#[derive(Debug)]
pub struct InMemorySource {
    catalog: RwLock<Catalog>,
    latency: Duration,
    available: AtomicBool,
    fetches: AtomicU64,
}

impl InMemorySource {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            latency: Duration::ZERO,
            available: AtomicBool::new(true),
            fetches: AtomicU64::new(0),
        }
    }

    /// Delay applied to every request.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// When unavailable, every request fails with [`SourceError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of requests served or refused so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Mutates the catalogue in place, as a write through the real store would.
    pub fn update<R>(&self, f: impl FnOnce(&mut Catalog) -> R) -> R {
        f(&mut self.catalog.write())
    }

    /// A small food court used by the service binary.
    pub fn seeded() -> Self {
        let business = |id: u64, name: &str, is_active: bool| Business {
            id,
            name: name.to_string(),
            owner_id: 100 + id,
            is_active,
        };
        let stall = |id: u64, business_id: u64, name: &str, cuisine: &str, is_active: bool| Stall {
            id,
            business_id,
            name: name.to_string(),
            cuisine: cuisine.to_string(),
            is_active,
        };
        let product = |id: u64, stall_id: u64, name: &str, price_cents: u64| Product {
            id,
            stall_id,
            name: name.to_string(),
            price_cents,
            is_available: true,
        };
        let opened = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().unwrap_or_default();

        Self::new(Catalog {
            businesses: vec![
                business(1, "Hawker Collective", true),
                business(2, "Night Market Co", true),
                business(3, "Closed Kitchens", false),
            ],
            stalls: vec![
                stall(1, 1, "Laksa King", "Peranakan", true),
                stall(2, 1, "Satay Street", "Malay", true),
                stall(3, 2, "Roti House", "Indian", true),
                stall(4, 3, "Old Dumplings", "Chinese", false),
            ],
            products: vec![
                product(1, 1, "Curry Laksa", 850),
                product(2, 1, "Assam Laksa", 800),
                product(3, 2, "Chicken Satay (10)", 1200),
                product(4, 3, "Roti Canai", 350),
                product(5, 3, "Murtabak", 900),
            ],
            users: vec![
                User {
                    id: 1,
                    email: "admin@foodcourt.test".into(),
                    name: "Admin".into(),
                    role: Role::Admin,
                },
                User {
                    id: 2,
                    email: "ada@example.com".into(),
                    name: "Ada".into(),
                    role: Role::Customer,
                },
            ],
            orders: vec![
                Order {
                    id: 1,
                    customer_id: 2,
                    stall_id: 1,
                    total_cents: 1650,
                    created_at: opened,
                },
                Order {
                    id: 2,
                    customer_id: 2,
                    stall_id: 3,
                    total_cents: 350,
                    created_at: opened + chrono::Duration::days(1),
                },
            ],
            order_items: vec![
                OrderItem {
                    order_id: 1,
                    product_id: 1,
                    quantity: 1,
                    unit_price_cents: 850,
                },
                OrderItem {
                    order_id: 1,
                    product_id: 2,
                    quantity: 1,
                    unit_price_cents: 800,
                },
                OrderItem {
                    order_id: 2,
                    product_id: 4,
                    quantity: 1,
                    unit_price_cents: 350,
                },
            ],
        })
    }

    async fn begin(&self) -> SourceResult<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SourceError::Unavailable("in-memory source switched off".into()))
        }
    }

    fn select<T: Clone>(&self, pick: impl Fn(&Catalog) -> &Vec<T>, keep: impl Fn(&T) -> bool) -> Vec<T> {
        let catalog = self.catalog.read();
        pick(&catalog).iter().filter(|item| keep(item)).cloned().collect()
    }
}

#[async_trait]
impl MarketplaceSource for InMemorySource {
    async fn active_stalls(&self) -> SourceResult<Vec<Stall>> {
        self.begin().await?;
        Ok(self.select(|c| &c.stalls, |s| s.is_active))
    }

    async fn active_products(&self) -> SourceResult<Vec<Product>> {
        self.begin().await?;
        Ok(self.select(|c| &c.products, |p| p.is_available))
    }

    async fn active_businesses(&self) -> SourceResult<Vec<Business>> {
        self.begin().await?;
        Ok(self.select(|c| &c.businesses, |b| b.is_active))
    }

    async fn stall(&self, id: u64) -> SourceResult<Stall> {
        self.begin().await?;
        self.select(|c| &c.stalls, |s| s.id == id)
            .pop()
            .ok_or_else(|| SourceError::not_found("stall", id))
    }

    async fn stalls_by_business(&self, business_id: u64) -> SourceResult<Vec<Stall>> {
        self.begin().await?;
        Ok(self.select(|c| &c.stalls, |s| s.business_id == business_id))
    }

    async fn products_by_stall(&self, stall_id: u64) -> SourceResult<Vec<Product>> {
        self.begin().await?;
        Ok(self.select(|c| &c.products, |p| p.stall_id == stall_id))
    }

    async fn order_items(&self, order_id: u64) -> SourceResult<Vec<OrderItem>> {
        self.begin().await?;
        Ok(self.select(|c| &c.order_items, |i| i.order_id == order_id))
    }

    async fn customer_order_stats(&self, customer_id: u64) -> SourceResult<CustomerOrderStats> {
        self.begin().await?;
        let orders = self.select(|c| &c.orders, |o| o.customer_id == customer_id);
        Ok(CustomerOrderStats {
            customer_id,
            total_orders: orders.len() as u64,
            total_spent_cents: orders.iter().map(|o| o.total_cents).sum(),
            last_order_at: orders.iter().map(|o| o.created_at).max(),
        })
    }

    async fn user(&self, id: u64) -> SourceResult<User> {
        self.begin().await?;
        self.select(|c| &c.users, |u| u.id == id)
            .pop()
            .ok_or_else(|| SourceError::not_found("user", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_active_sets_filter_inactive() {
        let source = InMemorySource::seeded();

        let stalls = source.active_stalls().await.unwrap();
        assert_eq!(stalls.len(), 3);
        assert!(stalls.iter().all(|s| s.is_active));

        let businesses = source.active_businesses().await.unwrap();
        assert_eq!(businesses.len(), 2);
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let source = InMemorySource::seeded();

        assert_eq!(
            source.stall(99).await,
            Err(SourceError::not_found("stall", 99))
        );
    }

    #[tokio::test]
    async fn test_customer_order_stats() {
        let source = InMemorySource::seeded();

        let stats = source.customer_order_stats(2).await.unwrap();
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.total_spent_cents, 2000);
        assert!(stats.last_order_at.is_some());

        let empty = source.customer_order_stats(42).await.unwrap();
        assert_eq!(empty.total_orders, 0);
        assert_eq!(empty.last_order_at, None);
    }

    #[tokio::test]
    async fn test_unavailable_source_fails() {
        let source = InMemorySource::seeded();
        source.set_available(false);

        assert!(matches!(
            source.active_stalls().await,
            Err(SourceError::Unavailable(_))
        ));

        source.set_available(true);
        assert!(source.active_stalls().await.is_ok());
    }

    #[tokio::test]
    async fn test_update_is_visible() {
        let source = InMemorySource::seeded();

        source.update(|catalog| catalog.stalls[0].is_active = false);

        assert_eq!(source.active_stalls().await.unwrap().len(), 2);
    }
}
