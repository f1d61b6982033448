//! Cache Statistics Module
//!
//! Snapshot of cache performance metrics including hits, misses, sets and
//! evictions.

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time cache performance metrics.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of stored values
    pub sets: u64,
    /// Number of entries evicted under capacity pressure
    pub evictions: u64,
    /// Mean latency of hits, in microseconds
    pub avg_hit_latency_us: f64,
    /// Mean latency of misses, in microseconds
    pub avg_miss_latency_us: f64,
    /// Mean end-to-end latency of sets, in microseconds
    pub avg_set_latency_us: f64,
    /// Mean time spent encoding values before a set, in microseconds
    pub avg_serialize_latency_us: f64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total read requests observed.
    pub fn requests(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Mean of `total` over `count`, or 0.0 when nothing was recorded.
pub(crate) fn mean(total: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}
