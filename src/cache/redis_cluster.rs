//! Redis Cluster Backend
//!
//! Remote backend over a redis cluster. Values are stored as raw bytes and
//! expiry is delegated to redis (`SET ... PX`).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use tracing::{debug, info};

use crate::cache::{Cache, ClusterConfig};
use crate::error::{CacheError, Result};

// == Redis Cluster Cache ==
/// Cache backed by a pool of multiplexed cluster connections.
pub struct RedisClusterCache {
    pool: Vec<ClusterConnection>,
    next: AtomicUsize,
    closed: AtomicBool,
}

impl RedisClusterCache {
    // == Connect ==
    /// Opens `pool_size` connections to the cluster described by `config`.
    pub async fn connect(config: &ClusterConfig) -> Result<Self> {
        if config.addrs.is_empty() {
            return Err(CacheError::Config(
                "redis cluster requires at least one address".to_string(),
            ));
        }

        let nodes: Vec<String> = config.addrs.iter().map(|addr| node_url(addr)).collect();
        let client = ClusterClient::new(nodes)?;

        let pool_size = config.pool_size.max(1);
        let mut pool = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            pool.push(client.get_async_connection().await?);
        }

        info!(
            "Connected to redis cluster: {} nodes, {} connections",
            config.addrs.len(),
            pool_size
        );

        Ok(Self {
            pool,
            next: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Round-robin pick from the pool.
    fn connection(&self) -> Result<ClusterConnection> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::Closed);
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.pool.len();
        Ok(self.pool[index].clone())
    }
}

/// Accepts bare `host:port` as well as full `redis://` URLs.
fn node_url(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("redis://{}", addr)
    }
}

/// Expiry in whole milliseconds; a sub-millisecond TTL still expires.
fn px_millis(ttl: Duration) -> u64 {
    let millis = ttl.as_millis().min(u64::MAX as u128) as u64;
    millis.max(1)
}

#[async_trait]
impl Cache for RedisClusterCache {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.connection()?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if !ttl.is_zero() {
            cmd.arg("PX").arg(px_millis(ttl));
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let mut conn = self.connection()?;
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        value.ok_or_else(|| CacheError::KeyNotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection()?;
        let _: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection()?;
        let count: i64 = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(count > 0)
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("redis cluster cache closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_url() {
        assert_eq!(node_url("10.0.0.1:7000"), "redis://10.0.0.1:7000");
        assert_eq!(node_url("rediss://cache:7000"), "rediss://cache:7000");
    }

    #[test]
    fn test_px_millis() {
        assert_eq!(px_millis(Duration::from_secs(2)), 2000);
        assert_eq!(px_millis(Duration::from_micros(10)), 1);
    }

    #[tokio::test]
    async fn test_connect_requires_addresses() {
        let config = ClusterConfig {
            addrs: Vec::new(),
            pool_size: 4,
        };
        let result = RedisClusterCache::connect(&config).await;
        assert!(matches!(result, Err(CacheError::Config(_))));
    }
}
