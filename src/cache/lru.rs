//! LRU Policy Module
//!
//! Implements Least Recently Used selection for cache eviction.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::cache::policy::{capacity_limit, lowest_ranked};
use crate::cache::{CacheEntry, EvictionPolicy};

// == LRU Policy ==
/// Tracks access order for LRU eviction strategy.
///
/// Recency is a logical clock: each access stamps the entry with the next
/// tick, so the smallest stamp is the least recently used entry regardless
/// of wall-clock resolution.
#[derive(Debug)]
pub struct LruPolicy {
    /// Maximum number of entries, 0 = defer to the caller
    max_items: usize,
    /// Next recency stamp
    clock: AtomicU64,
}

impl LruPolicy {
    // == Constructor ==
    pub fn new(max_items: usize) -> Self {
        Self {
            max_items,
            clock: AtomicU64::new(1),
        }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }
}

impl EvictionPolicy for LruPolicy {
    // == Touch ==
    /// Marks the entry as most recently used.
    fn on_access(&self, entry: &mut CacheEntry) {
        entry.last_access = self.clock.fetch_add(1, Ordering::Relaxed);
    }

    fn should_evict(&self, entry: &CacheEntry, current_count: usize, max_count: usize) -> bool {
        if entry.is_expired() {
            return true;
        }
        capacity_limit(self.max_items, max_count).is_some_and(|limit| current_count >= limit)
    }

    // == Evict Oldest ==
    /// Returns the `n` least recently accessed entries; among equal recency
    /// the earliest created goes first.
    fn select_eviction_candidates<'a>(
        &self,
        entries: &[&'a CacheEntry],
        n: usize,
    ) -> Vec<&'a CacheEntry> {
        lowest_ranked(entries, n, |entry| (entry.last_access, entry.created_at))
    }

    fn name(&self) -> &'static str {
        "lru"
    }
}
