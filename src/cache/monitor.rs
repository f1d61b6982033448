//! Cache Monitor Module
//!
//! Purely additive operation counters, scoped per key namespace, and a
//! decorator that feeds them from any `Cache`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::cache::stats::mean;
use crate::cache::{Cache, CacheStats};
use crate::error::Result;

/// Namespace used for keys without a `prefix:` segment.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Namespace of a key: the text before its first `:`.
pub fn namespace_of(key: &str) -> &str {
    match key.split_once(':') {
        Some((prefix, _)) if !prefix.is_empty() => prefix,
        _ => DEFAULT_NAMESPACE,
    }
}

// == Counters ==
/// Every field is its own atomic, so a reader never observes a torn value.
/// Fields are not updated together.
#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    evictions: AtomicU64,
    hit_latency_us: AtomicU64,
    miss_latency_us: AtomicU64,
    set_latency_us: AtomicU64,
    serializations: AtomicU64,
    serialize_latency_us: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let sets = self.sets.load(Ordering::Relaxed);
        let serializations = self.serializations.load(Ordering::Relaxed);

        CacheStats {
            hits,
            misses,
            sets,
            evictions: self.evictions.load(Ordering::Relaxed),
            avg_hit_latency_us: mean(self.hit_latency_us.load(Ordering::Relaxed), hits),
            avg_miss_latency_us: mean(self.miss_latency_us.load(Ordering::Relaxed), misses),
            avg_set_latency_us: mean(self.set_latency_us.load(Ordering::Relaxed), sets),
            avg_serialize_latency_us: mean(
                self.serialize_latency_us.load(Ordering::Relaxed),
                serializations,
            ),
        }
    }
}

fn micros(latency: Duration) -> u64 {
    latency.as_micros().min(u64::MAX as u128) as u64
}

/// Distinct namespaces tracked before new ones fold into the default.
pub const MAX_NAMESPACES: usize = 256;

// == Cache Monitor ==
/// Records hit/miss/set outcomes. Performs no cache I/O itself.
#[derive(Debug)]
pub struct CacheMonitor {
    total: Counters,
    namespaces: RwLock<HashMap<String, Arc<Counters>>>,
    max_namespaces: usize,
}

impl Default for CacheMonitor {
    fn default() -> Self {
        Self::with_namespace_limit(MAX_NAMESPACES)
    }
}

impl CacheMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks at most `limit` namespaces; later ones are recorded under
    /// `DEFAULT_NAMESPACE`.
    pub fn with_namespace_limit(limit: usize) -> Self {
        Self {
            total: Counters::default(),
            namespaces: RwLock::new(HashMap::new()),
            max_namespaces: limit,
        }
    }

    fn counters(&self, namespace: &str) -> Arc<Counters> {
        if let Some(counters) = self.namespaces.read().get(namespace) {
            return counters.clone();
        }

        let mut namespaces = self.namespaces.write();
        if let Some(counters) = namespaces.get(namespace) {
            return counters.clone();
        }
        let name = if namespaces.len() >= self.max_namespaces {
            DEFAULT_NAMESPACE
        } else {
            namespace
        };
        namespaces.entry(name.to_string()).or_default().clone()
    }

    // == Record ==
    pub fn record_hit(&self, namespace: &str, latency: Duration) {
        let us = micros(latency);
        for counters in [&self.total, &*self.counters(namespace)] {
            counters.hits.fetch_add(1, Ordering::Relaxed);
            counters.hit_latency_us.fetch_add(us, Ordering::Relaxed);
        }
    }

    pub fn record_miss(&self, namespace: &str, latency: Duration) {
        let us = micros(latency);
        for counters in [&self.total, &*self.counters(namespace)] {
            counters.misses.fetch_add(1, Ordering::Relaxed);
            counters.miss_latency_us.fetch_add(us, Ordering::Relaxed);
        }
    }

    /// Records a stored value; `serialize_latency` is the part of
    /// `total_latency` spent encoding it.
    pub fn record_set(&self, namespace: &str, serialize_latency: Duration, total_latency: Duration) {
        self.record_write(namespace, total_latency);
        self.record_serialization(namespace, serialize_latency);
    }

    /// Records a stored value whose encoding, if any, is reported
    /// separately.
    pub fn record_write(&self, namespace: &str, latency: Duration) {
        let us = micros(latency);
        for counters in [&self.total, &*self.counters(namespace)] {
            counters.sets.fetch_add(1, Ordering::Relaxed);
            counters.set_latency_us.fetch_add(us, Ordering::Relaxed);
        }
    }

    /// Records time spent encoding a value, without counting a set.
    pub fn record_serialization(&self, namespace: &str, latency: Duration) {
        let us = micros(latency);
        for counters in [&self.total, &*self.counters(namespace)] {
            counters.serializations.fetch_add(1, Ordering::Relaxed);
            counters.serialize_latency_us.fetch_add(us, Ordering::Relaxed);
        }
    }

    pub fn record_eviction(&self, namespace: &str) {
        for counters in [&self.total, &*self.counters(namespace)] {
            counters.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    // == Stats ==
    /// Aggregate statistics across all namespaces.
    pub fn stats(&self) -> CacheStats {
        self.total.snapshot()
    }

    /// Statistics for one namespace, None if nothing was recorded for it.
    pub fn namespace_stats(&self, namespace: &str) -> Option<CacheStats> {
        self.namespaces
            .read()
            .get(namespace)
            .map(|counters| counters.snapshot())
    }

    /// Names of all namespaces seen so far, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespaces.read().keys().cloned().collect();
        names.sort();
        names
    }
}

// == Monitored Cache ==
/// Decorator timing every `get` and `set` on the wrapped cache.
pub struct MonitoredCache<C> {
    inner: C,
    monitor: Arc<CacheMonitor>,
}

impl<C: Cache> MonitoredCache<C> {
    pub fn new(inner: C, monitor: Arc<CacheMonitor>) -> Self {
        Self { inner, monitor }
    }

    pub fn monitor(&self) -> &Arc<CacheMonitor> {
        &self.monitor
    }
}

#[async_trait]
impl<C: Cache> Cache for MonitoredCache<C> {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let started = Instant::now();
        self.inner.set(key, value, ttl).await?;
        self.monitor.record_write(namespace_of(key), started.elapsed());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let started = Instant::now();
        let result = self.inner.get(key).await;
        match &result {
            Ok(_) => self.monitor.record_hit(namespace_of(key), started.elapsed()),
            Err(err) if err.is_miss() => {
                self.monitor.record_miss(namespace_of(key), started.elapsed())
            }
            // faults are neither hits nor misses
            Err(_) => {}
        }
        result
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}
