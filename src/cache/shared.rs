//! Shared Cache Module
//!
//! Thread-safe handle around a [`CacheStore`] with a read-through helper
//! that coalesces concurrent misses on the same key.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::cache::{CacheEntry, CacheStats, CacheStore};

#[derive(Debug, Clone)]
enum Flight<T> {
    Pending,
    /// `None` when the leader's fetch failed
    Done(Option<T>),
}

struct FlightSlot<T> {
    id: u64,
    rx: watch::Receiver<Flight<T>>,
}

type FlightTable<T> = Arc<Mutex<HashMap<String, FlightSlot<T>>>>;

enum Role<T> {
    Leader(FlightGuard<T>),
    Follower(watch::Receiver<Flight<T>>),
}

/// Leadership over one in-flight fetch. The table slot is released when the
/// guard finishes or is dropped, whichever comes first.
struct FlightGuard<T> {
    key: String,
    id: u64,
    tx: watch::Sender<Flight<T>>,
    table: FlightTable<T>,
}

impl<T> FlightGuard<T> {
    fn finish(self, outcome: Option<T>) {
        self.release();
        self.tx.send_replace(Flight::Done(outcome));
    }

    fn release(&self) {
        let mut table = self.table.lock();
        if table.get(&self.key).is_some_and(|slot| slot.id == self.id) {
            table.remove(&self.key);
        }
    }
}

impl<T> Drop for FlightGuard<T> {
    fn drop(&mut self) {
        self.release();
    }
}

// == Shared Cache ==
/// Cloneable, thread-safe cache for one partition.
///
/// Clones share the same store. Each store operation holds the lock only for
/// its own duration and never across an `.await`, so individual operations
/// are atomic and the last write wins.
pub struct SharedCache<T> {
    name: Arc<str>,
    store: Arc<Mutex<CacheStore<T>>>,
    in_flight: FlightTable<T>,
    next_flight: Arc<AtomicU64>,
}

impl<T> Clone for SharedCache<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            store: Arc::clone(&self.store),
            in_flight: Arc::clone(&self.in_flight),
            next_flight: Arc::clone(&self.next_flight),
        }
    }
}

impl<T> std::fmt::Debug for SharedCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store = self.store.lock();
        f.debug_struct("SharedCache")
            .field("name", &self.name)
            .field("len", &store.len())
            .field("capacity", &store.capacity())
            .finish()
    }
}

impl<T> SharedCache<T> {
    /// Creates a named cache with its own store.
    pub fn new(name: impl Into<Arc<str>>, capacity: usize, default_ttl: Duration) -> Self {
        Self {
            name: name.into(),
            store: Arc::new(Mutex::new(CacheStore::new(capacity, default_ttl))),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_flight: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set(&self, key: impl Into<String>, value: T, ttl: Option<Duration>) {
        self.store.lock().set(key, value, ttl);
    }

    pub fn has(&self, key: &str) -> bool {
        self.store.lock().has(key)
    }

    pub fn delete(&self, key: &str) -> bool {
        self.store.lock().delete(key)
    }

    pub fn clear(&self) {
        self.store.lock().clear();
    }

    pub fn cleanup(&self) -> usize {
        self.store.lock().cleanup()
    }

    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    pub fn keys(&self) -> Vec<String> {
        self.store.lock().keys()
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.store.lock().capacity()
    }

    pub fn default_ttl(&self) -> Duration {
        self.store.lock().default_ttl()
    }

    /// Number of fetches currently in flight through `get_or_set`.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn join_flight(&self, key: &str) -> Role<T> {
        let mut table = self.in_flight.lock();
        if let Some(slot) = table.get(key) {
            return Role::Follower(slot.rx.clone());
        }

        let id = self.next_flight.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(Flight::Pending);
        table.insert(key.to_string(), FlightSlot { id, rx });

        Role::Leader(FlightGuard {
            key: key.to_string(),
            id,
            tx,
            table: Arc::clone(&self.in_flight),
        })
    }
}

// == Cache Handle ==
/// Value-type-independent view of a cache, for code that manages several
/// partitions at once without caring what they store.
pub trait CacheHandle: Send + Sync {
    fn name(&self) -> &str;
    fn stats(&self) -> CacheStats;
    fn keys(&self) -> Vec<String>;
    fn len(&self) -> usize;
    fn capacity(&self) -> usize;
    fn default_ttl(&self) -> Duration;
    fn clear(&self);
    fn cleanup(&self) -> usize;
}

impl<T: Send + Sync> CacheHandle for SharedCache<T> {
    fn name(&self) -> &str {
        SharedCache::name(self)
    }

    fn stats(&self) -> CacheStats {
        SharedCache::stats(self)
    }

    fn keys(&self) -> Vec<String> {
        SharedCache::keys(self)
    }

    fn len(&self) -> usize {
        SharedCache::len(self)
    }

    fn capacity(&self) -> usize {
        SharedCache::capacity(self)
    }

    fn default_ttl(&self) -> Duration {
        SharedCache::default_ttl(self)
    }

    fn clear(&self) {
        SharedCache::clear(self)
    }

    fn cleanup(&self) -> usize {
        SharedCache::cleanup(self)
    }
}

impl<T: Clone> SharedCache<T> {
    pub fn get(&self, key: &str) -> Option<T> {
        self.store.lock().get(key)
    }

    /// Copy of a live entry, metadata included, without recording an access.
    pub fn peek_entry(&self, key: &str) -> Option<CacheEntry<T>> {
        self.store.lock().peek(key).cloned()
    }
}

impl<T: Clone + Send + Sync + 'static> SharedCache<T> {
    // == Get Or Set ==
    /// Read-through lookup.
    ///
    /// On a hit the cached value is returned. On a miss exactly one caller
    /// per key runs its `fetch`; concurrent callers for the same key wait
    /// for that result instead of hitting the backing store themselves.
    ///
    /// Errors are never shared: if the running fetch fails, a waiting caller
    /// takes over and runs its own `fetch`. Whatever error a caller receives
    /// came from its own `fetch`, unmodified, and nothing is cached for it.
    pub async fn get_or_set<F, Fut, E>(
        &self,
        key: &str,
        fetch: F,
        ttl: Option<Duration>,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        loop {
            match self.join_flight(key) {
                Role::Follower(mut rx) => {
                    trace!(cache = %self.name, key = %key, "Joining in-flight fetch");
                    let outcome = rx
                        .wait_for(|flight| matches!(flight, Flight::Done(_)))
                        .await
                        .ok()
                        .and_then(|flight| match &*flight {
                            Flight::Done(value) => value.clone(),
                            Flight::Pending => None,
                        });

                    if let Some(value) = outcome {
                        return Ok(value);
                    }
                }
                Role::Leader(flight) => {
                    // Another leader may have finished between our miss and now
                    let cached = self.store.lock().peek(key).map(|entry| entry.value.clone());
                    if let Some(value) = cached {
                        flight.finish(Some(value.clone()));
                        return Ok(value);
                    }

                    return match fetch().await {
                        Ok(value) => {
                            self.set(key, value.clone(), ttl);
                            flight.finish(Some(value.clone()));
                            Ok(value)
                        }
                        Err(err) => {
                            debug!(cache = %self.name, key = %key, "Fetch failed, nothing cached");
                            flight.finish(None);
                            Err(err)
                        }
                    };
                }
            }
        }
    }

    // == Cached ==
    /// Wraps `fetch` into a cached version of itself.
    ///
    /// `key_fn` derives the cache key from the call arguments; every call of
    /// the returned function goes through [`get_or_set`](Self::get_or_set).
    pub fn cached<A, K, F, Fut, E>(
        &self,
        key_fn: K,
        ttl: Option<Duration>,
        fetch: F,
    ) -> impl Fn(A) -> BoxFuture<'static, Result<T, E>> + Send + Sync + 'static
    where
        A: Send + 'static,
        K: Fn(&A) -> String + Send + Sync + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Send + 'static,
    {
        let cache = self.clone();
        let fetch = Arc::new(fetch);

        move |args: A| {
            let key = key_fn(&args);
            let cache = cache.clone();
            let fetch = Arc::clone(&fetch);
            async move { cache.get_or_set(&key, move || (*fetch)(args), ttl).await }.boxed()
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio_test::{assert_err, assert_ok};

    fn cache() -> SharedCache<String> {
        SharedCache::new("stalls", 10, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_get_or_set_fetches_once() {
        let cache = cache();
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>("Noodle Bar".to_string())
        };

        let first = cache.get_or_set("stall:1", fetch, None).await;
        assert_eq!(assert_ok!(first), "Noodle Bar");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let second = cache.get_or_set("stall:1", fetch, None).await;
        assert_eq!(assert_ok!(second), "Noodle Bar");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_get_or_set_applies_ttl() {
        let cache = cache();

        let value = cache
            .get_or_set(
                "stall:1",
                || async { Ok::<_, String>("x".to_string()) },
                Some(Duration::from_millis(40)),
            )
            .await;
        assert_ok!(value);
        assert_eq!(
            cache.peek_entry("stall:1").unwrap().ttl,
            Duration::from_millis(40)
        );

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!cache.has("stall:1"));
    }

    #[tokio::test]
    async fn test_get_or_set_propagates_error() {
        let cache = cache();

        let result = cache
            .get_or_set("stall:1", || async { Err::<String, _>("rate limited") }, None)
            .await;

        assert_eq!(assert_err!(result), "rate limited");
        assert!(!cache.has("stall:1"));
        assert_eq!(cache.in_flight(), 0);

        // Not cached as a negative result: the next call fetches again
        let result = cache
            .get_or_set("stall:1", || async { Ok::<_, &str>("ok".to_string()) }, None)
            .await;
        assert_eq!(assert_ok!(result), "ok");
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let cache = cache();
        let calls = Arc::new(AtomicUsize::new(0));

        let callers = (0..10).map(|_| {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            async move {
                cache
                    .get_or_set(
                        "stalls:active",
                        || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok::<_, String>("all".to_string())
                        },
                        None,
                    )
                    .await
            }
        });

        let results = futures::future::join_all(callers).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap(), "all");
        }
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_waiter_takes_over_after_leader_failure() {
        let cache = cache();

        let leader = cache.get_or_set(
            "stall:1",
            || async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Err::<String, _>("leader failed".to_string())
            },
            None,
        );
        let waiter = cache.get_or_set(
            "stall:1",
            || async { Ok::<_, String>("from waiter".to_string()) },
            None,
        );

        let (leader, waiter) = tokio::join!(leader, waiter);

        assert_eq!(leader.unwrap_err(), "leader failed");
        assert_eq!(waiter.unwrap(), "from waiter");
        assert_eq!(cache.get("stall:1").as_deref(), Some("from waiter"));
    }

    #[tokio::test]
    async fn test_each_caller_sees_its_own_error() {
        let cache = cache();

        let first = cache.get_or_set(
            "stall:1",
            || async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err::<String, _>("first")
            },
            None,
        );
        let second = cache.get_or_set("stall:1", || async { Err::<String, _>("second") }, None);

        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap_err(), "first");
        assert_eq!(second.unwrap_err(), "second");
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_leader_releases_flight() {
        let cache = cache();

        let leader = tokio::time::timeout(
            Duration::from_millis(20),
            cache.get_or_set(
                "stall:1",
                || async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok::<_, String>("never".to_string())
                },
                None,
            ),
        );
        let waiter = cache.get_or_set(
            "stall:1",
            || async { Ok::<_, String>("waiter".to_string()) },
            None,
        );

        let (leader, waiter) = tokio::join!(leader, waiter);

        assert!(leader.is_err());
        assert_eq!(waiter.unwrap(), "waiter");
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cached_wrapper() {
        let cache = cache();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let stall_name = cache.cached(
            |id: &u32| format!("stall:{id}"),
            None,
            move |id: u32| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(format!("Stall #{id}"))
                }
            },
        );

        assert_eq!(stall_name(1).await.unwrap(), "Stall #1");
        assert_eq!(stall_name(1).await.unwrap(), "Stall #1");
        assert_eq!(stall_name(2).await.unwrap(), "Stall #2");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.has("stall:1"));
        assert!(cache.has("stall:2"));
    }

    #[test]
    fn test_clones_share_store() {
        let cache = cache();
        let other = cache.clone();

        cache.set("a", "1".to_string(), None);

        assert_eq!(other.get("a").as_deref(), Some("1"));
        assert!(other.delete("a"));
        assert!(cache.is_empty());
    }
}
