//! End-to-end cache scenarios through the public library API.

use std::sync::Arc;
use std::time::Duration;

use marketplace_cache::keys;
use marketplace_cache::marketplace::{CachedMarketplace, InMemorySource, MarketplaceCaches};
use marketplace_cache::tasks::CacheWarmer;
use marketplace_cache::{CacheStore, SharedCache};

#[test]
fn test_stall_partition_eviction_scenario() {
    let mut store = CacheStore::new(3, Duration::from_secs(60));
    store.set(keys::stall(1), "Laksa King", None);
    store.set(keys::stall(2), "Satay Street", None);
    store.set(keys::stall(3), "Roti House", None);

    assert_eq!(store.get(&keys::stall(1)), Some("Laksa King"));
    store.set(keys::stall(4), "Dumpling Den", None);

    let mut resident = store.keys();
    resident.sort();
    assert_eq!(resident, vec![keys::stall(1), keys::stall(3), keys::stall(4)]);
    assert_eq!(store.stats().evictions, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cold_cache_stampede_hits_source_once() {
    let source = Arc::new(InMemorySource::seeded().with_latency(Duration::from_millis(50)));
    let caches = Arc::new(MarketplaceCaches::with_defaults());
    let marketplace = CachedMarketplace::new(caches, source.clone());

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let marketplace = marketplace.clone();
            tokio::spawn(async move { marketplace.active_stalls().await })
        })
        .collect();

    for task in tasks {
        let stalls = task.await.unwrap().unwrap();
        assert_eq!(stalls.len(), 3);
    }

    assert_eq!(source.fetch_count(), 1);
    assert_eq!(marketplace.caches().stalls.in_flight(), 0);
}

#[tokio::test]
async fn test_warm_then_read_through_without_fetching() {
    let source = Arc::new(InMemorySource::seeded());
    let caches = Arc::new(MarketplaceCaches::with_defaults());
    let warmer = CacheWarmer::new(Arc::clone(&caches), source.clone());
    let marketplace = CachedMarketplace::new(caches, source.clone());

    warmer.warm_cache().await.unwrap();
    let fetches = source.fetch_count();

    assert_eq!(marketplace.stall(2).await.unwrap().name, "Satay Street");
    assert_eq!(marketplace.active_businesses().await.unwrap().len(), 2);
    assert_eq!(source.fetch_count(), fetches);
}

#[tokio::test]
async fn test_cached_wrapper_over_source() {
    let source = Arc::new(InMemorySource::seeded());
    let cache: SharedCache<String> = SharedCache::new("users", 100, Duration::from_secs(900));

    let lookup = {
        let source = Arc::clone(&source);
        cache.cached(
            |id: &u64| keys::user(id),
            None,
            move |id: u64| {
                let source = Arc::clone(&source);
                async move {
                    use marketplace_cache::marketplace::MarketplaceSource;
                    source.user(id).await.map(|user| user.name)
                }
            },
        )
    };

    assert_eq!(lookup(2).await.unwrap(), "Ada");
    assert_eq!(lookup(2).await.unwrap(), "Ada");
    assert!(lookup(7).await.is_err());

    assert_eq!(source.fetch_count(), 2);
    assert!(cache.has(&keys::user(2)));
    assert!(!cache.has(&keys::user(7)));
}

#[tokio::test]
async fn test_refresh_handle_shutdown() {
    let source = Arc::new(InMemorySource::seeded());
    let caches = Arc::new(MarketplaceCaches::with_defaults());
    let warmer = Arc::new(CacheWarmer::new(caches, source.clone()));

    let refresh = warmer.start_periodic_refresh(Duration::from_millis(25));
    tokio::time::sleep(Duration::from_millis(60)).await;
    refresh.shutdown().await;

    let fetches = source.fetch_count();
    assert!(fetches >= 3);
    assert!(warmer.last_run().is_some());

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(source.fetch_count(), fetches);
}
