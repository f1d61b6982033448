//! LFU Policy Module
//!
//! Least Frequently Used selection for cache eviction.

use crate::cache::policy::{capacity_limit, lowest_ranked};
use crate::cache::{CacheEntry, EvictionPolicy};

/// Evicts the entries with the fewest recorded accesses first.
#[derive(Debug)]
pub struct LfuPolicy {
    max_items: usize,
}

impl LfuPolicy {
    pub fn new(max_items: usize) -> Self {
        Self { max_items }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }
}

impl EvictionPolicy for LfuPolicy {
    fn on_access(&self, entry: &mut CacheEntry) {
        entry.access_count = entry.access_count.saturating_add(1);
    }

    fn should_evict(&self, entry: &CacheEntry, current_count: usize, max_count: usize) -> bool {
        if entry.is_expired() {
            return true;
        }
        capacity_limit(self.max_items, max_count).is_some_and(|limit| current_count >= limit)
    }

    /// Lowest access count first; ties go to the oldest entry.
    fn select_eviction_candidates<'a>(
        &self,
        entries: &[&'a CacheEntry],
        n: usize,
    ) -> Vec<&'a CacheEntry> {
        lowest_ranked(entries, n, |entry| (entry.access_count, entry.created_at))
    }

    fn name(&self) -> &'static str {
        "lfu"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn accessed(policy: &LfuPolicy, key: &str, times: usize) -> CacheEntry {
        let mut entry = CacheEntry::new(key, vec![0], Duration::ZERO);
        for _ in 0..times {
            policy.on_access(&mut entry);
        }
        entry
    }

    #[test]
    fn test_lfu_counts_accesses() {
        let lfu = LfuPolicy::new(10);
        let entry = accessed(&lfu, "a", 4);
        assert_eq!(entry.access_count, 4);
    }

    #[test]
    fn test_lfu_selects_least_frequent() {
        let lfu = LfuPolicy::new(3);
        let hot = accessed(&lfu, "hot", 9);
        let warm = accessed(&lfu, "warm", 3);
        let cold = accessed(&lfu, "cold", 1);

        let selected = lfu.select_eviction_candidates(&[&hot, &warm, &cold], 2);
        let keys: Vec<&str> = selected.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["cold", "warm"]);
    }

    #[test]
    fn test_lfu_tie_broken_by_oldest() {
        let lfu = LfuPolicy::new(3);
        let now = Utc::now();
        let mut old = CacheEntry::created_at("old", vec![], Duration::ZERO, now - chrono::Duration::seconds(60));
        let mut young = CacheEntry::created_at("young", vec![], Duration::ZERO, now);
        lfu.on_access(&mut old);
        lfu.on_access(&mut young);

        let selected = lfu.select_eviction_candidates(&[&young, &old], 1);
        assert_eq!(selected[0].key, "old");
    }

    #[test]
    fn test_lfu_should_evict() {
        let lfu = LfuPolicy::new(5);
        let entry = accessed(&lfu, "a", 1);

        assert!(!lfu.should_evict(&entry, 4, 0));
        assert!(lfu.should_evict(&entry, 5, 0));
        assert!(!LfuPolicy::new(0).should_evict(&entry, 1_000, 0));
    }
}
