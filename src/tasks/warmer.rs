//! Cache Warmer
//!
//! Primes the catalogue partitions with the backing store's active sets and
//! keeps them fresh on a timer, sweeping expired entries out of every
//! partition after each pass.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::SharedCache;
use crate::keys;
use crate::marketplace::{
    Entity, Keyed, MarketplaceCaches, MarketplaceSource, Partition, SourceResult,
};

// == Reports ==
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WarmOutcome {
    /// Entries written, aggregate key included
    Warmed { entries: usize },
    /// Previously cached data was left in place
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionWarm {
    pub partition: Partition,
    #[serde(flatten)]
    pub outcome: WarmOutcome,
}

/// Result of one warm pass, one line per warmed partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarmReport {
    pub partitions: Vec<PartitionWarm>,
}

impl WarmReport {
    pub fn entries(&self) -> usize {
        self.partitions
            .iter()
            .map(|p| match p.outcome {
                WarmOutcome::Warmed { entries } => entries,
                WarmOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> usize {
        self.partitions
            .iter()
            .filter(|p| matches!(p.outcome, WarmOutcome::Failed { .. }))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarmRun {
    pub finished_at: DateTime<Utc>,
    pub report: WarmReport,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupReport {
    pub removed: BTreeMap<Partition, usize>,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.removed.values().sum()
    }
}

// == Cache Warmer ==
pub struct CacheWarmer {
    caches: Arc<MarketplaceCaches>,
    source: Arc<dyn MarketplaceSource>,
    warm_lock: tokio::sync::Mutex<()>,
    last_run: parking_lot::Mutex<Option<WarmRun>>,
}

impl CacheWarmer {
    pub fn new(caches: Arc<MarketplaceCaches>, source: Arc<dyn MarketplaceSource>) -> Self {
        Self {
            caches,
            source,
            warm_lock: tokio::sync::Mutex::new(()),
            last_run: parking_lot::Mutex::new(None),
        }
    }

    pub fn caches(&self) -> &Arc<MarketplaceCaches> {
        &self.caches
    }

    /// Most recent completed warm pass, if any.
    pub fn last_run(&self) -> Option<WarmRun> {
        self.last_run.lock().clone()
    }

    /// Loads the active stalls, products and businesses into their partitions.
    ///
    /// Every member is stored under its own key and the whole set under the
    /// partition's aggregate key, with the partition's default TTL. A
    /// partition whose fetch fails keeps whatever it already held.
    ///
    /// Returns `None` without touching the backing store when another warm
    /// pass is still running.
    pub async fn warm_cache(&self) -> Option<WarmReport> {
        let Ok(_running) = self.warm_lock.try_lock() else {
            info!("Warm pass already running, skipping");
            return None;
        };

        let caches = &self.caches;
        let partitions = vec![
            PartitionWarm {
                partition: Partition::Stalls,
                outcome: store_active(
                    &caches.stalls,
                    keys::active_stalls(),
                    self.source.active_stalls().await,
                ),
            },
            PartitionWarm {
                partition: Partition::Products,
                outcome: store_active(
                    &caches.products,
                    keys::active_products(),
                    self.source.active_products().await,
                ),
            },
            PartitionWarm {
                partition: Partition::Businesses,
                outcome: store_active(
                    &caches.businesses,
                    keys::active_businesses(),
                    self.source.active_businesses().await,
                ),
            },
        ];

        let report = WarmReport { partitions };
        info!(
            entries = report.entries(),
            failures = report.failures(),
            "Cache warm pass complete"
        );

        *self.last_run.lock() = Some(WarmRun {
            finished_at: Utc::now(),
            report: report.clone(),
        });
        Some(report)
    }

    /// Removes expired entries from every partition.
    pub fn cleanup(&self) -> CleanupReport {
        let removed: BTreeMap<_, _> = self
            .caches
            .handles()
            .map(|(partition, cache)| (partition, cache.cleanup()))
            .collect();
        let report = CleanupReport { removed };

        match report.total() {
            0 => debug!("Cleanup: no expired entries found"),
            total => info!(removed = total, "Cleanup: removed expired entries"),
        }
        report
    }

    /// Spawns the refresh loop: every `interval`, a warm pass followed by a
    /// cleanup. The first pass runs one interval after the call.
    ///
    /// The loop runs until [`RefreshHandle::stop`] is called; dropping the
    /// handle leaves it running. A panicking pass is logged and the loop
    /// carries on with the next tick.
    pub fn start_periodic_refresh(self: &Arc<Self>, interval: Duration) -> RefreshHandle {
        let interval = if interval.is_zero() {
            warn!("Refresh interval of zero requested, using 1s");
            Duration::from_secs(1)
        } else {
            interval
        };

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let warmer = Arc::clone(self);

        let handle = tokio::spawn(async move {
            info!(interval_ms = interval.as_millis() as u64, "Starting periodic cache refresh");

            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => warmer.refresh_once().await,
                }
            }

            info!("Periodic cache refresh stopped");
        });

        RefreshHandle { token, handle }
    }

    async fn refresh_once(&self) {
        if AssertUnwindSafe(self.warm_cache())
            .catch_unwind()
            .await
            .is_err()
        {
            error!("Scheduled warm pass panicked");
        }

        if std::panic::catch_unwind(AssertUnwindSafe(|| self.cleanup())).is_err() {
            error!("Scheduled cleanup panicked");
        }
    }
}

fn store_active<T>(
    cache: &SharedCache<Entity<T>>,
    aggregate_key: String,
    fetched: SourceResult<Vec<T>>,
) -> WarmOutcome
where
    T: Keyed + Clone,
{
    match fetched {
        Ok(records) => {
            for record in &records {
                cache.set(record.cache_key(), Entity::One(record.clone()), None);
            }
            let entries = records.len() + 1;
            // Aggregate last so eviction during the pass takes members first
            cache.set(aggregate_key, Entity::Many(records), None);
            WarmOutcome::Warmed { entries }
        }
        Err(err) => {
            warn!(cache = %cache.name(), error = %err, "Warm failed, keeping cached data");
            WarmOutcome::Failed {
                error: err.to_string(),
            }
        }
    }
}

// == Refresh Handle ==
/// Control over a running refresh loop.
#[derive(Debug)]
pub struct RefreshHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl RefreshHandle {
    /// Asks the loop to stop. A pass already in progress finishes first.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Stops the loop and waits for it to exit.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(err) = self.handle.await {
            warn!(error = %err, "Refresh task ended abnormally");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}
