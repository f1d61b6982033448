//! Cache Factory Module
//!
//! Builds configured backends and composes the decorator chain.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::{
    Cache, CacheMonitor, EvictionKind, MemoryCache, MonitoredCache, RedisClusterCache,
};
use crate::config::ProductionConfig;
use crate::error::{CacheError, Result};
use crate::security::SecureCache;
use crate::tasks::spawn_cleanup_task;

// == Backend Kind ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[default]
    Memory,
    RedisCluster,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Memory => f.write_str("memory"),
            BackendKind::RedisCluster => f.write_str("redis-cluster"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "redis-cluster" => Ok(BackendKind::RedisCluster),
            other => Err(CacheError::Config(format!("unknown cache backend '{}'", other))),
        }
    }
}

// == Cluster Config ==
/// Connection settings for the redis-cluster backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Seed node addresses (`host:port` or `redis://` URLs)
    pub addrs: Vec<String>,
    /// Number of multiplexed connections
    pub pool_size: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            addrs: Vec::new(),
            pool_size: 10,
        }
    }
}

// == Cache Config ==
/// Backend selection and sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: BackendKind,
    /// Maximum number of entries for the memory backend, 0 = unbounded
    pub max_items: usize,
    /// TTL applied by callers that don't choose one
    pub default_ttl: Duration,
    pub eviction: EvictionKind,
    /// Interval of the memory backend's expiry sweep
    pub cleanup_interval: Duration,
    pub cluster: ClusterConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            max_items: 10_000,
            default_ttl: Duration::from_secs(300),
            eviction: EvictionKind::Lru,
            cleanup_interval: Duration::from_secs(1),
            cluster: ClusterConfig::default(),
        }
    }
}

// == Cache Factory ==
pub struct CacheFactory;

impl CacheFactory {
    /// Builds a bare backend from `config`.
    pub async fn create(config: &CacheConfig) -> Result<Arc<dyn Cache>> {
        Self::create_backend(config, None).await
    }

    /// Builds the full chain for a validated production config:
    /// backend, then monitoring, then security.
    pub async fn build(config: &ProductionConfig, monitor: Arc<CacheMonitor>) -> Result<Arc<dyn Cache>> {
        config.validate()?;

        let monitoring = config.monitoring.enabled.then(|| monitor.clone());
        let backend = Self::create_backend(&config.to_cache_config(), monitoring).await?;

        let cache: Arc<dyn Cache> = if config.monitoring.enabled {
            Arc::new(MonitoredCache::new(backend, monitor))
        } else {
            backend
        };

        if config.security.any_enabled() {
            info!(
                "Security layer enabled: encryption={}, auth={}, rate_limiting={}",
                config.security.encryption_enabled,
                config.security.auth_enabled,
                config.security.rate_limiting_enabled
            );
            Ok(Arc::new(SecureCache::new(cache, &config.security)?))
        } else {
            Ok(cache)
        }
    }

    async fn create_backend(
        config: &CacheConfig,
        monitor: Option<Arc<CacheMonitor>>,
    ) -> Result<Arc<dyn Cache>> {
        match config.backend {
            BackendKind::Memory => {
                let mut cache = MemoryCache::with_policy(config.max_items, config.eviction);
                if let Some(monitor) = monitor {
                    cache = cache.with_monitor(monitor);
                }
                let cache = Arc::new(cache);
                spawn_cleanup_task(&cache, config.cleanup_interval);
                info!(
                    "Memory cache initialized: max_items={}, policy={}",
                    config.max_items, config.eviction
                );
                Ok(cache)
            }
            BackendKind::RedisCluster => {
                let cache = RedisClusterCache::connect(&config.cluster).await?;
                Ok(Arc::new(cache))
            }
        }
    }
}
