//! Cache Module
//!
//! Byte-oriented cache backends, pluggable eviction policies and
//! operation statistics.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

mod entry;
mod factory;
mod lfu;
mod lru;
mod memory;
mod monitor;
pub(crate) mod policy;
mod redis_cluster;
mod stats;
mod ttl;


// Re-export public types
pub use entry::CacheEntry;
pub use factory::{BackendKind, CacheConfig, CacheFactory, ClusterConfig};
pub use lfu::LfuPolicy;
pub use lru::LruPolicy;
pub use memory::{MemoryCache, StoreStats};
pub use monitor::{namespace_of, CacheMonitor, MonitoredCache};
pub use policy::{EvictionKind, EvictionPolicy};
pub use redis_cluster::RedisClusterCache;
pub use stats::CacheStats;
pub use ttl::TtlPolicy;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

// == Cache ==
/// Byte-oriented key/value store with TTL support.
///
/// A `ttl` of `Duration::ZERO` stores the value without expiry. A miss is
/// always `CacheError::KeyNotFound`; any other error is a fault.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Returns the value, or `KeyNotFound` if absent or expired.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Removes the key. Succeeds when the key is absent.
    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Releases backend resources. Calling it again is a no-op.
    async fn close(&self) -> Result<()>;
}

impl std::fmt::Debug for dyn Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Cache")
    }
}

#[async_trait]
impl<C: Cache + ?Sized> Cache for Arc<C> {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        (**self).set(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        (**self).get(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}
