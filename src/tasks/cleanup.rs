//! TTL Cleanup Task
//!
//! Background task that periodically removes expired entries from a memory
//! cache. The task ends when the cache is closed or dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::MemoryCache;

/// Spawns a background task that periodically cleans up expired entries.
///
/// The task holds only a weak reference, so it never keeps the cache
/// alive, and it stops as soon as the cache's shutdown token fires.
///
/// # Returns
/// A JoinHandle for the spawned task.
pub fn spawn_cleanup_task(cache: &Arc<MemoryCache>, interval: Duration) -> JoinHandle<()> {
    let shutdown = cache.shutdown_token();
    let cache = Arc::downgrade(cache);

    tokio::spawn(async move {
        info!("Starting TTL cleanup task with interval of {:?}", interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let Some(cache) = cache.upgrade() else {
                break;
            };
            let removed = cache.cleanup_expired().await;

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }

        debug!("TTL cleanup task exited");
    })
}
