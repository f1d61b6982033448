//! Configuration Module
//!
//! Production configuration: performance, security, monitoring and
//! high-availability settings, loaded from environment variables and
//! validated as a unit before anything starts.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::{BackendKind, CacheConfig, ClusterConfig, EvictionKind};
use crate::error::{CacheError, Result};
use crate::tasks::{WarmerConfig, DEFAULT_TICK_INTERVAL};

/// Fewer cluster nodes than this is reported as an availability risk.
pub const MIN_RECOMMENDED_CLUSTER_NODES: usize = 3;

// == Performance ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Maximum number of entries for the memory backend
    pub max_items: usize,
    /// Default TTL in seconds for entries stored without one
    pub default_ttl: u64,
    pub eviction_policy: EvictionKind,
    /// Expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Warmer driver tick in seconds
    pub warm_tick_interval: u64,
    /// Per-refresh timeout in seconds, 0 = unbounded
    pub refresh_timeout: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_items: 10_000,
            default_ttl: 300,
            eviction_policy: EvictionKind::Lru,
            cleanup_interval: 1,
            warm_tick_interval: DEFAULT_TICK_INTERVAL.as_secs(),
            refresh_timeout: 10,
        }
    }
}

// == Security ==
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub encryption_enabled: bool,
    pub encryption_key: String,
    pub auth_enabled: bool,
    /// Key prefixes readable and writable when auth is enabled
    pub allowed_prefixes: Vec<String>,
    pub rate_limiting_enabled: bool,
    /// Requests allowed per window
    pub rate_limit: u32,
    /// Rate limit window in seconds
    pub rate_limit_window: u64,
}

impl SecurityConfig {
    pub fn any_enabled(&self) -> bool {
        self.encryption_enabled || self.auth_enabled || self.rate_limiting_enabled
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window)
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            encryption_enabled: false,
            encryption_key: String::new(),
            auth_enabled: false,
            allowed_prefixes: Vec::new(),
            rate_limiting_enabled: false,
            rate_limit: 1000,
            rate_limit_window: 1,
        }
    }
}

// The key never reaches logs.
impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("encryption_enabled", &self.encryption_enabled)
            .field("encryption_key", &"<redacted>")
            .field("auth_enabled", &self.auth_enabled)
            .field("allowed_prefixes", &self.allowed_prefixes)
            .field("rate_limiting_enabled", &self.rate_limiting_enabled)
            .field("rate_limit", &self.rate_limit)
            .field("rate_limit_window", &self.rate_limit_window)
            .finish()
    }
}

// == Monitoring ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    /// Stats logging interval in seconds, 0 = never
    pub log_interval: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_interval: 60,
        }
    }
}

// == High Availability ==
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HighAvailabilityConfig {
    pub backend: BackendKind,
    pub cluster_config: ClusterConfig,
}

// == Server ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP server port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

// == Validation Report ==
/// Outcome of a successful validation: risks that do not block startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

// == Production Config ==
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionConfig {
    pub performance: PerformanceConfig,
    pub security: SecurityConfig,
    pub monitoring: MonitoringConfig,
    pub high_availability: HighAvailabilityConfig,
    pub server: ServerConfig,
}

impl ProductionConfig {
    /// Creates a config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `memory` or `redis-cluster` (default: memory)
    /// - `CACHE_MAX_ITEMS` - Maximum memory entries (default: 10000)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_EVICTION_POLICY` - `lru`, `lfu` or `ttl` (default: lru)
    /// - `CACHE_CLEANUP_INTERVAL` - Expiry sweep in seconds (default: 1)
    /// - `CACHE_WARM_TICK_INTERVAL` - Warmer tick in seconds (default: 30)
    /// - `CACHE_REFRESH_TIMEOUT` - Per-refresh timeout in seconds (default: 10)
    /// - `CACHE_ENCRYPTION_ENABLED`, `CACHE_ENCRYPTION_KEY`
    /// - `CACHE_AUTH_ENABLED`, `CACHE_ALLOWED_PREFIXES` (comma separated)
    /// - `CACHE_RATE_LIMITING_ENABLED`, `CACHE_RATE_LIMIT`, `CACHE_RATE_LIMIT_WINDOW`
    /// - `CACHE_MONITORING_ENABLED`, `CACHE_STATS_LOG_INTERVAL`
    /// - `CACHE_CLUSTER_ADDRS` (comma separated), `CACHE_CLUSTER_POOL_SIZE`
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            performance: PerformanceConfig {
                max_items: env_or("CACHE_MAX_ITEMS", defaults.performance.max_items),
                default_ttl: env_or("CACHE_DEFAULT_TTL", defaults.performance.default_ttl),
                eviction_policy: env_or(
                    "CACHE_EVICTION_POLICY",
                    defaults.performance.eviction_policy,
                ),
                cleanup_interval: env_or(
                    "CACHE_CLEANUP_INTERVAL",
                    defaults.performance.cleanup_interval,
                ),
                warm_tick_interval: env_or(
                    "CACHE_WARM_TICK_INTERVAL",
                    defaults.performance.warm_tick_interval,
                ),
                refresh_timeout: env_or(
                    "CACHE_REFRESH_TIMEOUT",
                    defaults.performance.refresh_timeout,
                ),
            },
            security: SecurityConfig {
                encryption_enabled: env_or(
                    "CACHE_ENCRYPTION_ENABLED",
                    defaults.security.encryption_enabled,
                ),
                encryption_key: env::var("CACHE_ENCRYPTION_KEY").unwrap_or_default(),
                auth_enabled: env_or("CACHE_AUTH_ENABLED", defaults.security.auth_enabled),
                allowed_prefixes: env_list("CACHE_ALLOWED_PREFIXES"),
                rate_limiting_enabled: env_or(
                    "CACHE_RATE_LIMITING_ENABLED",
                    defaults.security.rate_limiting_enabled,
                ),
                rate_limit: env_or("CACHE_RATE_LIMIT", defaults.security.rate_limit),
                rate_limit_window: env_or(
                    "CACHE_RATE_LIMIT_WINDOW",
                    defaults.security.rate_limit_window,
                ),
            },
            monitoring: MonitoringConfig {
                enabled: env_or("CACHE_MONITORING_ENABLED", defaults.monitoring.enabled),
                log_interval: env_or("CACHE_STATS_LOG_INTERVAL", defaults.monitoring.log_interval),
            },
            high_availability: HighAvailabilityConfig {
                backend: env_or("CACHE_BACKEND", defaults.high_availability.backend),
                cluster_config: ClusterConfig {
                    addrs: env_list("CACHE_CLUSTER_ADDRS"),
                    pool_size: env_or(
                        "CACHE_CLUSTER_POOL_SIZE",
                        defaults.high_availability.cluster_config.pool_size,
                    ),
                },
            },
            server: ServerConfig {
                port: env_or("SERVER_PORT", defaults.server.port),
            },
        }
    }

    // == Validate ==
    /// Checks the configuration as a unit.
    ///
    /// Hard errors fail with `CacheError::Config`; availability risks are
    /// returned in the report and logged.
    pub fn validate(&self) -> Result<ValidationReport> {
        let mut errors = Vec::new();
        let mut report = ValidationReport::default();

        let perf = &self.performance;
        if perf.max_items == 0 && perf.eviction_policy != EvictionKind::Ttl {
            errors.push(format!(
                "performance.max_items must be > 0 for the {} policy",
                perf.eviction_policy
            ));
        }
        if perf.cleanup_interval == 0 {
            errors.push("performance.cleanup_interval must be > 0".to_string());
        }
        if perf.warm_tick_interval == 0 {
            errors.push("performance.warm_tick_interval must be > 0".to_string());
        }

        let security = &self.security;
        if security.encryption_enabled && security.encryption_key.is_empty() {
            errors.push("security.encryption_key is required when encryption is enabled".to_string());
        }
        if security.rate_limiting_enabled {
            if security.rate_limit == 0 {
                errors.push("security.rate_limit must be > 0 when rate limiting is enabled".to_string());
            }
            if security.rate_limit_window == 0 {
                errors.push("security.rate_limit_window must be > 0".to_string());
            }
        }
        if security.auth_enabled && security.allowed_prefixes.is_empty() {
            report
                .warnings
                .push("auth is enabled without allowed prefixes; every key is permitted".to_string());
        }

        let cluster = &self.high_availability.cluster_config;
        if cluster.pool_size == 0 {
            errors.push("high_availability.cluster_config.pool_size must be > 0".to_string());
        }
        if self.high_availability.backend == BackendKind::RedisCluster {
            if cluster.addrs.is_empty() {
                errors.push("redis-cluster backend requires cluster addresses".to_string());
            } else if cluster.addrs.len() < MIN_RECOMMENDED_CLUSTER_NODES {
                report.warnings.push(format!(
                    "cluster has {} address(es); at least {} are recommended for high availability",
                    cluster.addrs.len(),
                    MIN_RECOMMENDED_CLUSTER_NODES
                ));
            }
        }

        if !errors.is_empty() {
            return Err(CacheError::Config(errors.join("; ")));
        }

        for warning in &report.warnings {
            warn!("Configuration risk: {}", warning);
        }
        Ok(report)
    }

    // == Projections ==
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            backend: self.high_availability.backend,
            max_items: self.performance.max_items,
            default_ttl: self.default_ttl(),
            eviction: self.performance.eviction_policy,
            cleanup_interval: Duration::from_secs(self.performance.cleanup_interval),
            cluster: self.high_availability.cluster_config.clone(),
        }
    }

    pub fn to_warmer_config(&self) -> WarmerConfig {
        WarmerConfig {
            tick_interval: Duration::from_secs(self.performance.warm_tick_interval),
            refresh_timeout: (self.performance.refresh_timeout > 0)
                .then(|| Duration::from_secs(self.performance.refresh_timeout)),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.performance.default_ttl)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_list(name: &str) -> Vec<String> {
    env::var(name)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let report = ProductionConfig::default().validate().unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn test_encryption_without_key_rejected() {
        let mut config = ProductionConfig::default();
        config.security.encryption_enabled = true;
        config.security.encryption_key = String::new();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, CacheError::Config(ref msg) if msg.contains("encryption_key")));
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let mut config = ProductionConfig::default();
        config.high_availability.cluster_config.pool_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_max_items_allowed_only_for_ttl() {
        let mut config = ProductionConfig::default();
        config.performance.max_items = 0;
        assert!(config.validate().is_err());

        config.performance.eviction_policy = EvictionKind::Ttl;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rate_limit_zero_rejected() {
        let mut config = ProductionConfig::default();
        config.security.rate_limiting_enabled = true;
        config.security.rate_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_small_cluster_is_warning() {
        let mut config = ProductionConfig::default();
        config.high_availability.backend = BackendKind::RedisCluster;
        config.high_availability.cluster_config.addrs =
            vec!["10.0.0.1:7000".to_string(), "10.0.0.2:7000".to_string()];

        let report = config.validate().unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("2 address"));
    }

    #[test]
    fn test_three_node_cluster_is_clean() {
        let mut config = ProductionConfig::default();
        config.high_availability.backend = BackendKind::RedisCluster;
        config.high_availability.cluster_config.addrs =
            (1..=3).map(|i| format!("10.0.0.{}:7000", i)).collect();

        assert!(config.validate().unwrap().is_clean());
    }

    #[test]
    fn test_cluster_without_addresses_rejected() {
        let mut config = ProductionConfig::default();
        config.high_availability.backend = BackendKind::RedisCluster;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_errors_are_combined() {
        let mut config = ProductionConfig::default();
        config.performance.cleanup_interval = 0;
        config.performance.warm_tick_interval = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("cleanup_interval"));
        assert!(err.contains("warm_tick_interval"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let security = SecurityConfig {
            encryption_key: "super-secret".to_string(),
            ..SecurityConfig::default()
        };
        let printed = format!("{:?}", security);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_projections() {
        let config = ProductionConfig::default();

        let cache = config.to_cache_config();
        assert_eq!(cache.max_items, 10_000);
        assert_eq!(cache.default_ttl, Duration::from_secs(300));

        let warmer = config.to_warmer_config();
        assert_eq!(warmer.tick_interval, Duration::from_secs(30));
        assert_eq!(warmer.refresh_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ProductionConfig = serde_json::from_str(
            r#"{"security": {"encryption_enabled": true, "encryption_key": "k"},
                "high_availability": {"backend": "redis-cluster",
                                      "cluster_config": {"addrs": ["a:1", "b:1", "c:1"], "pool_size": 4}}}"#,
        )
        .unwrap();

        assert_eq!(config.performance, PerformanceConfig::default());
        assert_eq!(config.high_availability.cluster_config.pool_size, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("CACHE_MAX_ITEMS", "42");
        env::set_var("CACHE_EVICTION_POLICY", "lfu");
        env::set_var("CACHE_ALLOWED_PREFIXES", "user:, post: ,");
        env::set_var("CACHE_RATE_LIMIT", "not-a-number");
        env::remove_var("SERVER_PORT");

        let config = ProductionConfig::from_env();
        assert_eq!(config.performance.max_items, 42);
        assert_eq!(config.performance.eviction_policy, EvictionKind::Lfu);
        assert_eq!(config.security.allowed_prefixes, vec!["user:", "post:"]);
        assert_eq!(config.security.rate_limit, 1000);
        assert_eq!(config.server.port, 3000);

        env::remove_var("CACHE_MAX_ITEMS");
        env::remove_var("CACHE_EVICTION_POLICY");
        env::remove_var("CACHE_ALLOWED_PREFIXES");
        env::remove_var("CACHE_RATE_LIMIT");
    }
}
