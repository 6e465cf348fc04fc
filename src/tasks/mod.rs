//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Cache warming: primes catalogue partitions from the backing store
//! - TTL cleanup: sweeps expired entries after every warm pass

mod warmer;

pub use warmer::{
    CacheWarmer, CleanupReport, PartitionWarm, RefreshHandle, WarmOutcome, WarmReport, WarmRun,
};
