//! Memory Cache Module
//!
//! In-process backend combining HashMap storage with a pluggable eviction
//! policy and TTL expiration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cache::{
    namespace_of, Cache, CacheEntry, CacheMonitor, EvictionKind, EvictionPolicy, MAX_KEY_LENGTH,
    MAX_VALUE_SIZE,
};
use crate::error::{CacheError, Result};

// == Store Stats ==
/// Occupancy and removal counters for a memory store.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StoreStats {
    /// Current number of entries
    pub entries: usize,
    /// Entries removed under capacity pressure
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
}

// == Memory Store ==
/// Lock-free inner state; always accessed through `MemoryCache`'s lock so
/// eviction decisions are serialized with reads and writes.
#[derive(Debug)]
struct MemoryStore {
    entries: HashMap<String, CacheEntry>,
    policy: Box<dyn EvictionPolicy>,
    stats: StoreStats,
    /// Maximum number of entries allowed, 0 = unbounded
    max_entries: usize,
}

impl MemoryStore {
    fn new(max_entries: usize, policy: Box<dyn EvictionPolicy>) -> Self {
        Self {
            entries: HashMap::new(),
            policy,
            stats: StoreStats::default(),
            max_entries,
        }
    }

    // == Set ==
    /// Stores a key-value pair. Returns the keys evicted to make room.
    fn set(&mut self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<Vec<String>> {
        validate(key, &value)?;

        let previous = self.entries.remove(key);
        let evicted = if previous.is_none() {
            self.make_room()?
        } else {
            Vec::new()
        };

        let mut entry = CacheEntry::new(key, value, ttl);
        if let Some(previous) = previous {
            entry.last_access = previous.last_access;
            entry.access_count = previous.access_count;
        }
        self.policy.on_access(&mut entry);
        self.entries.insert(key.to_string(), entry);
        self.stats.entries = self.entries.len();

        Ok(evicted)
    }

    // == Get ==
    /// Returns the value if present and live; expired entries are dropped.
    fn get(&mut self, key: &str) -> Result<Vec<u8>> {
        match self.entries.get_mut(key) {
            None => return Err(CacheError::KeyNotFound(key.to_string())),
            Some(entry) if !entry.is_expired() => {
                self.policy.on_access(entry);
                return Ok(entry.value.clone());
            }
            Some(_) => {}
        }

        self.entries.remove(key);
        self.stats.expirations += 1;
        self.stats.entries = self.entries.len();
        Err(CacheError::KeyNotFound(key.to_string()))
    }

    fn exists(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    fn delete(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.stats.entries = self.entries.len();
        }
    }

    // == Make Room ==
    /// Frees one slot when the store is at capacity. Expired entries go
    /// first; then the policy picks a victim.
    fn make_room(&mut self) -> Result<Vec<String>> {
        if self.max_entries == 0 || self.entries.len() < self.max_entries {
            return Ok(Vec::new());
        }

        self.cleanup_expired();

        let mut evicted = Vec::new();
        while self.entries.len() >= self.max_entries {
            let victim = {
                let current = self.entries.len();
                let refs: Vec<&CacheEntry> = self.entries.values().collect();
                self.policy
                    .select_eviction_candidates(&refs, 1)
                    .into_iter()
                    .find(|entry| self.policy.should_evict(entry, current, self.max_entries))
                    .map(|entry| entry.key.clone())
            };

            let Some(victim) = victim else {
                return Err(CacheError::CacheFull(format!(
                    "{} entries and the {} policy selected nothing to evict",
                    self.entries.len(),
                    self.policy.name()
                )));
            };

            self.entries.remove(&victim);
            self.stats.evictions += 1;
            debug!(key = %victim, policy = self.policy.name(), "evicted entry");
            evicted.push(victim);
        }

        self.stats.entries = self.entries.len();
        Ok(evicted)
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were removed.
    fn cleanup_expired(&mut self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));

        let removed = before - self.entries.len();
        self.stats.expirations += removed as u64;
        self.stats.entries = self.entries.len();
        removed
    }
}

/// Rejects keys and values the store refuses to hold.
fn validate(key: &str, value: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }

    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }

    if value.len() > MAX_VALUE_SIZE {
        return Err(CacheError::InvalidRequest(format!(
            "Value exceeds maximum size of {} bytes",
            MAX_VALUE_SIZE
        )));
    }

    Ok(())
}

// == Memory Cache ==
/// Thread-safe in-memory backend.
#[derive(Debug)]
pub struct MemoryCache {
    store: RwLock<MemoryStore>,
    closed: AtomicBool,
    /// Cancelled on close; background sweeps watch it
    shutdown: CancellationToken,
    monitor: Option<Arc<CacheMonitor>>,
}

impl MemoryCache {
    // == Constructor ==
    /// Creates a memory cache holding at most `max_entries` (0 = unbounded).
    pub fn new(max_entries: usize, policy: Box<dyn EvictionPolicy>) -> Self {
        Self {
            store: RwLock::new(MemoryStore::new(max_entries, policy)),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            monitor: None,
        }
    }

    /// Creates a memory cache with one of the built-in policies.
    pub fn with_policy(max_entries: usize, kind: EvictionKind) -> Self {
        Self::new(max_entries, kind.build(max_entries))
    }

    /// Reports evictions to `monitor`.
    pub fn with_monitor(mut self, monitor: Arc<CacheMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub async fn policy_name(&self) -> &'static str {
        self.store.read().await.policy.name()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // == Stats ==
    pub async fn store_stats(&self) -> StoreStats {
        self.store.read().await.stats.clone()
    }

    /// Removes all expired entries; used by the background sweep.
    pub async fn cleanup_expired(&self) -> usize {
        self.store.write().await.cleanup_expired()
    }

    /// Token cancelled when the cache is closed.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(CacheError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.ensure_open()?;
        let evicted = self.store.write().await.set(key, value, ttl)?;

        if let Some(monitor) = &self.monitor {
            for key in &evicted {
                monitor.record_eviction(namespace_of(key));
            }
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.ensure_open()?;
        // write lock: a hit updates policy bookkeeping
        self.store.write().await.get(key)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.ensure_open()?;
        self.store.write().await.delete(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.store.read().await.exists(key))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.shutdown.cancel();
        let mut store = self.store.write().await;
        store.entries.clear();
        store.stats.entries = 0;
        debug!("memory cache closed");
        Ok(())
    }
}
