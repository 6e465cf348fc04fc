//! Cached data access
//!
//! [`CachedMarketplace`] is what request handlers call instead of the
//! backing store: every read goes through the partition's cache, every write
//! path invalidates the keys it makes stale.

use std::future::Future;
use std::sync::Arc;

use tracing::warn;

use crate::cache::SharedCache;
use crate::keys;
use crate::marketplace::partitions::MarketplaceCaches;
use crate::marketplace::source::{MarketplaceSource, SourceResult};
use crate::marketplace::types::{
    Business, CustomerOrderStats, Entity, Order, OrderData, OrderItem, Product, Stall, User,
};

#[derive(Clone)]
pub struct CachedMarketplace {
    caches: Arc<MarketplaceCaches>,
    source: Arc<dyn MarketplaceSource>,
}

impl CachedMarketplace {
    pub fn new(caches: Arc<MarketplaceCaches>, source: Arc<dyn MarketplaceSource>) -> Self {
        Self { caches, source }
    }

    pub fn caches(&self) -> &MarketplaceCaches {
        &self.caches
    }

    // == Stalls ==
    pub async fn stall(&self, id: u64) -> SourceResult<Stall> {
        read_through(
            &self.caches.stalls,
            &keys::stall(id),
            move || self.source.stall(id),
            Entity::One,
            Entity::into_one,
        )
        .await
    }

    pub async fn stalls_for_business(&self, business_id: u64) -> SourceResult<Vec<Stall>> {
        read_through(
            &self.caches.stalls,
            &keys::stalls_by_business(business_id),
            move || self.source.stalls_by_business(business_id),
            Entity::Many,
            Entity::into_many,
        )
        .await
    }

    pub async fn active_stalls(&self) -> SourceResult<Vec<Stall>> {
        read_through(
            &self.caches.stalls,
            &keys::active_stalls(),
            move || self.source.active_stalls(),
            Entity::Many,
            Entity::into_many,
        )
        .await
    }

    // == Products ==
    pub async fn products_for_stall(&self, stall_id: u64) -> SourceResult<Vec<Product>> {
        read_through(
            &self.caches.products,
            &keys::products_by_stall(stall_id),
            move || self.source.products_by_stall(stall_id),
            Entity::Many,
            Entity::into_many,
        )
        .await
    }

    pub async fn active_products(&self) -> SourceResult<Vec<Product>> {
        read_through(
            &self.caches.products,
            &keys::active_products(),
            move || self.source.active_products(),
            Entity::Many,
            Entity::into_many,
        )
        .await
    }

    // == Businesses ==
    pub async fn active_businesses(&self) -> SourceResult<Vec<Business>> {
        read_through(
            &self.caches.businesses,
            &keys::active_businesses(),
            move || self.source.active_businesses(),
            Entity::Many,
            Entity::into_many,
        )
        .await
    }

    // == Orders ==
    pub async fn order_items(&self, order_id: u64) -> SourceResult<Vec<OrderItem>> {
        read_through(
            &self.caches.orders,
            &keys::order_items(order_id),
            move || self.source.order_items(order_id),
            OrderData::Items,
            OrderData::into_items,
        )
        .await
    }

    pub async fn customer_order_stats(&self, customer_id: u64) -> SourceResult<CustomerOrderStats> {
        read_through(
            &self.caches.orders,
            &keys::customer_order_stats(customer_id),
            move || self.source.customer_order_stats(customer_id),
            OrderData::CustomerStats,
            OrderData::into_customer_stats,
        )
        .await
    }

    // == Users ==
    pub async fn user(&self, id: u64) -> SourceResult<User> {
        read_through(
            &self.caches.users,
            &keys::user(id),
            move || self.source.user(id),
            |user| user,
            Some,
        )
        .await
    }

    // == Invalidation ==
    /// Drops every cached view a change to `stall` makes stale.
    pub fn invalidate_stall(&self, stall: &Stall) {
        let stalls = &self.caches.stalls;
        stalls.delete(&keys::stall(stall.id));
        stalls.delete(&keys::stalls_by_business(stall.business_id));
        stalls.delete(&keys::active_stalls());
        self.caches.products.delete(&keys::products_by_stall(stall.id));
    }

    /// Drops the cached line items and customer aggregates for `order`.
    pub fn invalidate_order(&self, order: &Order) {
        let orders = &self.caches.orders;
        orders.delete(&keys::order(order.id));
        orders.delete(&keys::order_items(order.id));
        orders.delete(&keys::customer_orders(order.customer_id));
        orders.delete(&keys::customer_order_stats(order.customer_id));
    }

    pub fn invalidate_user(&self, user: &User) {
        self.caches.users.delete(&keys::user(user.id));
        self.caches.users.delete(&keys::user_by_email(&user.email));
    }
}

/// Reads `key` through `cache`, converting between the record the source
/// returns and the partition's value shape.
///
/// A value of the wrong shape under `key` is replaced with a fresh fetch.
async fn read_through<V, R, F, Fut, W, U>(
    cache: &SharedCache<V>,
    key: &str,
    fetch: F,
    wrap: W,
    unwrap: U,
) -> SourceResult<R>
where
    V: Clone + Send + Sync + 'static,
    R: Clone,
    F: Fn() -> Fut,
    Fut: Future<Output = SourceResult<R>>,
    W: Fn(R) -> V,
    U: Fn(V) -> Option<R>,
{
    let (fetch_ref, wrap_ref) = (&fetch, &wrap);
    let value = cache
        .get_or_set(key, move || async move { fetch_ref().await.map(wrap_ref) }, None)
        .await?;

    if let Some(record) = unwrap(value) {
        return Ok(record);
    }

    warn!(cache = %cache.name(), key = %key, "Cached value has unexpected shape, refetching");
    cache.delete(key);
    let record = fetch().await?;
    cache.set(key, wrap(record.clone()), None);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::marketplace::source::InMemorySource;

    fn setup() -> (CachedMarketplace, Arc<InMemorySource>) {
        let source = Arc::new(InMemorySource::seeded());
        let caches = Arc::new(MarketplaceCaches::with_defaults());
        let marketplace = CachedMarketplace::new(caches, source.clone());
        (marketplace, source)
    }

    #[tokio::test]
    async fn test_second_read_served_from_cache() {
        let (marketplace, source) = setup();

        let first = marketplace.stall(1).await.unwrap();
        let second = marketplace.stall(1).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.fetch_count(), 1);

        let stats = marketplace.caches().stalls.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_partitions_use_own_stores() {
        let (marketplace, _source) = setup();

        marketplace.active_stalls().await.unwrap();
        marketplace.products_for_stall(1).await.unwrap();
        marketplace.order_items(1).await.unwrap();
        marketplace.user(2).await.unwrap();

        let caches = marketplace.caches();
        assert!(caches.stalls.has(&keys::active_stalls()));
        assert!(caches.products.has(&keys::products_by_stall(1)));
        assert!(caches.orders.has(&keys::order_items(1)));
        assert!(caches.users.has(&keys::user(2)));
    }

    #[tokio::test]
    async fn test_errors_pass_through_uncached() {
        let (marketplace, source) = setup();

        let result = marketplace.stall(99).await;
        assert_eq!(result, Err(SourceError::not_found("stall", 99)));
        assert!(!marketplace.caches().stalls.has(&keys::stall(99)));

        source.set_available(false);
        assert!(matches!(
            marketplace.active_businesses().await,
            Err(SourceError::Unavailable(_))
        ));
        assert!(marketplace.caches().businesses.is_empty());
    }

    #[tokio::test]
    async fn test_cached_value_survives_source_outage() {
        let (marketplace, source) = setup();

        let stats = marketplace.customer_order_stats(2).await.unwrap();
        source.set_available(false);

        assert_eq!(marketplace.customer_order_stats(2).await.unwrap(), stats);
    }

    #[tokio::test]
    async fn test_invalidate_stall_forces_refetch() {
        let (marketplace, source) = setup();

        let stall = marketplace.stall(1).await.unwrap();
        marketplace.active_stalls().await.unwrap();
        assert_eq!(source.fetch_count(), 2);

        source.update(|catalog| catalog.stalls[0].name = "Laksa Queen".into());
        marketplace.invalidate_stall(&stall);

        assert!(!marketplace.caches().stalls.has(&keys::active_stalls()));
        assert_eq!(marketplace.stall(1).await.unwrap().name, "Laksa Queen");
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_wrong_shape_is_replaced() {
        let (marketplace, source) = setup();

        // A list sitting under a single-record key
        marketplace
            .caches()
            .stalls
            .set(keys::stall(1), Entity::Many(vec![]), None);

        let stall = marketplace.stall(1).await.unwrap();

        assert_eq!(stall.id, 1);
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(
            marketplace.caches().stalls.get(&keys::stall(1)),
            Some(Entity::One(stall))
        );
    }

    #[tokio::test]
    async fn test_invalidate_order_and_user() {
        let (marketplace, source) = setup();

        marketplace.order_items(1).await.unwrap();
        marketplace.customer_order_stats(2).await.unwrap();
        let user = marketplace.user(2).await.unwrap();

        let order = source.update(|catalog| catalog.orders[0].clone());
        marketplace.invalidate_order(&order);
        marketplace.invalidate_user(&user);

        let caches = marketplace.caches();
        assert!(caches.orders.is_empty());
        assert!(caches.users.is_empty());
    }
}
