//! Security decorator over any `Cache`

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::cache::Cache;
use crate::config::SecurityConfig;
use crate::error::{CacheError, Result};
use crate::security::{AccessPolicy, CacheEncryptor, CacheOp, PrefixAccessPolicy, RateLimiter};

// == Secure Cache ==
/// Wraps a cache with rate limiting, access control and at-rest
/// encryption, checked in that order on every call.
///
/// Closing a `SecureCache` closes the wrapped cache.
#[derive(Debug)]
pub struct SecureCache<C> {
    inner: C,
    encryptor: Option<CacheEncryptor>,
    rate_limiter: Option<RateLimiter>,
    access: Option<Box<dyn AccessPolicy>>,
}

impl<C: Cache> SecureCache<C> {
    /// Builds the enabled layers from `config`. Fails with `InvalidKey`
    /// when encryption is enabled without a key.
    pub fn new(inner: C, config: &SecurityConfig) -> Result<Self> {
        let encryptor = if config.encryption_enabled {
            Some(CacheEncryptor::new(&config.encryption_key)?)
        } else {
            None
        };

        let rate_limiter = config
            .rate_limiting_enabled
            .then(|| RateLimiter::new(config.rate_limit, config.rate_limit_window()));

        let access = config.auth_enabled.then(|| {
            Box::new(PrefixAccessPolicy::new(config.allowed_prefixes.iter().cloned()))
                as Box<dyn AccessPolicy>
        });

        Ok(Self {
            inner,
            encryptor,
            rate_limiter,
            access,
        })
    }

    /// Replaces the access policy (enables access control if it was off).
    pub fn with_access_policy(mut self, policy: Box<dyn AccessPolicy>) -> Self {
        self.access = Some(policy);
        self
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn guard(&self, op: CacheOp, key: &str) -> Result<()> {
        if let Some(limiter) = &self.rate_limiter {
            if !limiter.try_acquire() {
                warn!(key, %op, "rate limit exceeded");
                return Err(CacheError::RateLimited {
                    limit: limiter.limit(),
                });
            }
        }

        if let Some(policy) = &self.access {
            if !policy.check(op, key) {
                warn!(key, %op, "access denied");
                return Err(CacheError::AccessDenied(key.to_string()));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl<C: Cache> Cache for SecureCache<C> {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.guard(CacheOp::Write, key)?;
        let value = match &self.encryptor {
            Some(encryptor) => encryptor.encrypt(&value)?,
            None => value,
        };
        self.inner.set(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.guard(CacheOp::Read, key)?;
        let stored = self.inner.get(key).await?;
        match &self.encryptor {
            Some(encryptor) => encryptor.decrypt(&stored),
            None => Ok(stored),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.guard(CacheOp::Delete, key)?;
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.guard(CacheOp::Read, key)?;
        self.inner.exists(key).await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{EvictionKind, MemoryCache};
    use std::sync::Arc;

    fn memory() -> Arc<MemoryCache> {
        Arc::new(MemoryCache::with_policy(100, EvictionKind::Lru))
    }

    fn config() -> SecurityConfig {
        SecurityConfig {
            encryption_enabled: true,
            encryption_key: "unit-test-key".to_string(),
            ..SecurityConfig::default()
        }
    }

    #[tokio::test]
    async fn test_values_encrypted_at_rest() {
        let backend = memory();
        let cache = SecureCache::new(backend.clone(), &config()).unwrap();

        cache.set("k", b"secret".to_vec(), Duration::ZERO).await.unwrap();

        let raw = backend.get("k").await.unwrap();
        assert_ne!(raw, b"secret");
        assert_eq!(cache.get("k").await.unwrap(), b"secret");
    }

    #[tokio::test]
    async fn test_missing_key_rejected() {
        let config = SecurityConfig {
            encryption_key: String::new(),
            ..config()
        };
        let result = SecureCache::new(memory(), &config);
        assert!(matches!(result, Err(CacheError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_corrupted_stored_value() {
        let backend = memory();
        let cache = SecureCache::new(backend.clone(), &config()).unwrap();

        backend.set("k", b"not encrypted".to_vec(), Duration::ZERO).await.unwrap();
        assert!(matches!(cache.get("k").await, Err(CacheError::Decryption(_))));
    }

    #[tokio::test]
    async fn test_miss_passes_through() {
        let cache = SecureCache::new(memory(), &config()).unwrap();
        assert!(matches!(cache.get("absent").await, Err(CacheError::KeyNotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_does_not_reach_backend() {
        let backend = memory();
        let config = SecurityConfig {
            rate_limiting_enabled: true,
            rate_limit: 2,
            ..SecurityConfig::default()
        };
        let cache = SecureCache::new(backend.clone(), &config).unwrap();

        cache.set("a", b"1".to_vec(), Duration::ZERO).await.unwrap();
        cache.set("b", b"2".to_vec(), Duration::ZERO).await.unwrap();
        let result = cache.set("c", b"3".to_vec(), Duration::ZERO).await;

        assert!(matches!(result, Err(CacheError::RateLimited { limit: 2 })));
        assert!(!backend.exists("c").await.unwrap());
    }

    #[tokio::test]
    async fn test_access_control() {
        let backend = memory();
        let config = SecurityConfig {
            auth_enabled: true,
            allowed_prefixes: vec!["user:".to_string()],
            ..SecurityConfig::default()
        };
        let cache = SecureCache::new(backend.clone(), &config).unwrap();

        cache.set("user:1", b"ok".to_vec(), Duration::ZERO).await.unwrap();
        let denied = cache.set("admin:1", b"no".to_vec(), Duration::ZERO).await;

        assert!(matches!(denied, Err(CacheError::AccessDenied(_))));
        assert!(!backend.exists("admin:1").await.unwrap());
        assert!(matches!(cache.delete("admin:1").await, Err(CacheError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_custom_access_policy() {
        #[derive(Debug)]
        struct ReadOnly;
        impl AccessPolicy for ReadOnly {
            fn check(&self, op: CacheOp, _key: &str) -> bool {
                op == CacheOp::Read
            }
        }

        let cache = SecureCache::new(memory(), &SecurityConfig::default())
            .unwrap()
            .with_access_policy(Box::new(ReadOnly));

        assert!(matches!(
            cache.set("k", vec![1], Duration::ZERO).await,
            Err(CacheError::AccessDenied(_))
        ));
        assert!(!cache.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_close_delegates() {
        let backend = memory();
        let cache = SecureCache::new(backend.clone(), &config()).unwrap();

        cache.close().await.unwrap();
        assert!(matches!(backend.get("k").await, Err(CacheError::Closed)));
    }
}
