//! TTL Policy Module

use chrono::Utc;

use crate::cache::{CacheEntry, EvictionPolicy};

/// Stateless policy that only ever evicts expired entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct TtlPolicy;

impl TtlPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl EvictionPolicy for TtlPolicy {
    fn on_access(&self, _entry: &mut CacheEntry) {}

    fn should_evict(&self, entry: &CacheEntry, _current_count: usize, _max_count: usize) -> bool {
        entry.is_expired()
    }

    /// Expired entries only, soonest deadline first.
    fn select_eviction_candidates<'a>(
        &self,
        entries: &[&'a CacheEntry],
        n: usize,
    ) -> Vec<&'a CacheEntry> {
        let now = Utc::now();
        let mut expired: Vec<&'a CacheEntry> = entries
            .iter()
            .copied()
            .filter(|entry| entry.is_expired_at(now))
            .collect();
        expired.sort_by_key(|entry| entry.expires_at);
        expired.truncate(n);
        expired
    }

    fn name(&self) -> &'static str {
        "ttl"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entry_aged(key: &str, ttl_secs: u64, age_secs: i64) -> CacheEntry {
        let created = Utc::now() - chrono::Duration::seconds(age_secs);
        CacheEntry::created_at(key, vec![], Duration::from_secs(ttl_secs), created)
    }

    #[test]
    fn test_ttl_past_expiry_should_evict() {
        let policy = TtlPolicy::new();
        assert!(policy.should_evict(&entry_aged("a", 5, 10), 0, 0));
    }

    #[test]
    fn test_ttl_future_expiry_kept() {
        let policy = TtlPolicy::new();
        assert!(!policy.should_evict(&entry_aged("a", 60, 10), usize::MAX, 1));
    }

    #[test]
    fn test_ttl_zero_never_evicts() {
        let policy = TtlPolicy::new();
        let forever = CacheEntry::new("a", vec![], Duration::ZERO);
        assert!(!policy.should_evict(&forever, 10, 1));
    }

    #[test]
    fn test_ttl_candidates_only_expired() {
        let policy = TtlPolicy::new();
        let long_gone = entry_aged("long_gone", 1, 100);
        let just_gone = entry_aged("just_gone", 5, 10);
        let live = entry_aged("live", 600, 1);

        let selected = policy.select_eviction_candidates(&[&live, &just_gone, &long_gone], 3);
        let keys: Vec<&str> = selected.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["long_gone", "just_gone"]);
    }
}
