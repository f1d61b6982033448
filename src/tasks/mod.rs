//! Background Tasks Module
//!
//! Contains the tasks that run alongside the cache.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired memory-cache entries at configured intervals
//! - Cache Warming: Refreshes registered keys before they expire
//! - Stats Reporter: Logs monitor statistics periodically

mod cleanup;
mod reporter;
mod warmer;

pub use cleanup::spawn_cleanup_task;
pub use reporter::spawn_stats_reporter;
pub use warmer::{CacheWarmer, WarmerConfig, WarmingJobStatus, DEFAULT_TICK_INTERVAL};
