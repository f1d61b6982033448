//! Eviction Policy Module
//!
//! Pluggable, advisory eviction strategies. A policy never removes anything
//! itself: the backend (or a sweep) asks it which entries to drop and
//! performs the delete.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, LfuPolicy, LruPolicy, TtlPolicy};
use crate::error::CacheError;

// == Eviction Policy ==
/// Strategy deciding which entries to remove under capacity pressure.
pub trait EvictionPolicy: Send + Sync + fmt::Debug {
    /// Records an access (read or write) on the entry's bookkeeping fields.
    fn on_access(&self, entry: &mut CacheEntry);

    /// Returns true when the entry should be evicted given the current and
    /// maximum number of entries in the store.
    fn should_evict(&self, entry: &CacheEntry, current_count: usize, max_count: usize) -> bool;

    /// Picks up to `n` entries to evict, in eviction order.
    fn select_eviction_candidates<'a>(
        &self,
        entries: &[&'a CacheEntry],
        n: usize,
    ) -> Vec<&'a CacheEntry>;

    /// Short policy identifier used in logs and stats.
    fn name(&self) -> &'static str;
}

/// Effective capacity: the smaller non-zero of the policy bound and the
/// caller's bound. Zero on both sides means unbounded.
pub(crate) fn capacity_limit(own: usize, caller: usize) -> Option<usize> {
    match (own, caller) {
        (0, 0) => None,
        (0, c) => Some(c),
        (o, 0) => Some(o),
        (o, c) => Some(o.min(c)),
    }
}

/// Sorts a copy of `entries` by `rank` and keeps the first `n`.
pub(crate) fn lowest_ranked<'a, K, F>(entries: &[&'a CacheEntry], n: usize, rank: F) -> Vec<&'a CacheEntry>
where
    K: Ord,
    F: Fn(&CacheEntry) -> K,
{
    let mut sorted: Vec<&'a CacheEntry> = entries.to_vec();
    sorted.sort_by_key(|entry| rank(entry));
    sorted.truncate(n);
    sorted
}

// == Eviction Kind ==
/// Configurable selector for the built-in policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionKind {
    #[default]
    Lru,
    Lfu,
    Ttl,
}

impl EvictionKind {
    /// Instantiates the policy bounded by `max_items` (ignored by TTL).
    pub fn build(self, max_items: usize) -> Box<dyn EvictionPolicy> {
        match self {
            EvictionKind::Lru => Box::new(LruPolicy::new(max_items)),
            EvictionKind::Lfu => Box::new(LfuPolicy::new(max_items)),
            EvictionKind::Ttl => Box::new(TtlPolicy::new()),
        }
    }
}

impl fmt::Display for EvictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvictionKind::Lru => "lru",
            EvictionKind::Lfu => "lfu",
            EvictionKind::Ttl => "ttl",
        };
        f.write_str(name)
    }
}

impl FromStr for EvictionKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionKind::Lru),
            "lfu" => Ok(EvictionKind::Lfu),
            "ttl" => Ok(EvictionKind::Ttl),
            other => Err(CacheError::Config(format!(
                "unknown eviction policy '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_limit() {
        assert_eq!(capacity_limit(0, 0), None);
        assert_eq!(capacity_limit(10, 0), Some(10));
        assert_eq!(capacity_limit(0, 4), Some(4));
        assert_eq!(capacity_limit(10, 4), Some(4));
    }

    #[test]
    fn test_kind_parse_and_build() {
        for (raw, expected) in [("lru", "lru"), ("LFU", "lfu"), (" ttl ", "ttl")] {
            let kind: EvictionKind = raw.parse().unwrap();
            assert_eq!(kind.build(8).name(), expected);
            assert_eq!(kind.to_string(), expected);
        }
        assert!("fifo".parse::<EvictionKind>().is_err());
    }

    #[test]
    fn test_kind_serde() {
        let kind: EvictionKind = serde_json::from_str("\"lfu\"").unwrap();
        assert_eq!(kind, EvictionKind::Lfu);
        assert_eq!(serde_json::to_string(&EvictionKind::Ttl).unwrap(), "\"ttl\"");
    }
}
