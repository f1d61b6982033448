//! Periodic statistics logging

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cache::CacheMonitor;

/// Logs the monitor's aggregate and per-namespace stats every `interval`
/// until `shutdown` fires.
pub fn spawn_stats_reporter(
    monitor: Arc<CacheMonitor>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => log_stats(&monitor),
            }
        }
    })
}

fn log_stats(monitor: &CacheMonitor) {
    let total = monitor.stats();
    info!(
        hits = total.hits,
        misses = total.misses,
        sets = total.sets,
        evictions = total.evictions,
        hit_rate = total.hit_rate(),
        "Cache stats"
    );

    for namespace in monitor.namespaces() {
        if let Some(stats) = monitor.namespace_stats(&namespace) {
            info!(
                namespace = %namespace,
                hits = stats.hits,
                misses = stats.misses,
                sets = stats.sets,
                avg_hit_latency_us = stats.avg_hit_latency_us,
                "Namespace stats"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reporter_stops_on_shutdown() {
        let monitor = Arc::new(CacheMonitor::new());
        monitor.record_hit("user", Duration::from_micros(3));
        let shutdown = CancellationToken::new();

        let handle = spawn_stats_reporter(monitor, Duration::from_secs(1), shutdown.clone());
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!handle.is_finished());

        shutdown.cancel();
        handle.await.unwrap();
    }
}
