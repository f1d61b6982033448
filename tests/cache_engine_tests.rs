//! End-to-end tests of the engine as a library: factory chain, security
//! layer, monitor and warmer working together.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;
use warmcache::cache::{
    BackendKind, Cache, CacheConfig, CacheFactory, CacheMonitor, EvictionKind, MemoryCache,
};
use warmcache::codec::{Codec, JsonCodec};
use warmcache::config::SecurityConfig;
use warmcache::security::{SecureCache, NONCE_LEN, TAG_LEN};
use warmcache::{CacheError, CacheWarmer, ProductionConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    id: u64,
    name: String,
    followers: u32,
}

fn encrypted_config() -> ProductionConfig {
    let mut config = ProductionConfig::default();
    config.security.encryption_enabled = true;
    config.security.encryption_key = "engine-test-key".to_string();
    config.performance.warm_tick_interval = 1;
    config.performance.refresh_timeout = 0;
    config
}

#[tokio::test]
async fn test_secure_cache_stores_ciphertext() {
    let backend = Arc::new(MemoryCache::with_policy(16, EvictionKind::Lru));
    let security = SecurityConfig {
        encryption_enabled: true,
        encryption_key: "at-rest".to_string(),
        ..SecurityConfig::default()
    };
    let cache = assert_ok!(SecureCache::new(backend.clone(), &security));

    let plaintext = b"credit-card-number".to_vec();
    assert_ok!(cache.set("user:1", plaintext.clone(), Duration::ZERO).await);

    let raw = assert_ok!(backend.get("user:1").await);
    assert_eq!(raw.len(), plaintext.len() + NONCE_LEN + TAG_LEN);
    assert_ne!(raw, plaintext);

    assert_eq!(assert_ok!(cache.get("user:1").await), plaintext);
}

#[tokio::test]
async fn test_secure_cache_rejects_foreign_ciphertext() {
    let backend = Arc::new(MemoryCache::with_policy(16, EvictionKind::Lru));
    let writer = SecureCache::new(
        backend.clone(),
        &SecurityConfig {
            encryption_enabled: true,
            encryption_key: "writer-key".to_string(),
            ..SecurityConfig::default()
        },
    )
    .unwrap();
    let reader = SecureCache::new(
        backend,
        &SecurityConfig {
            encryption_enabled: true,
            encryption_key: "reader-key".to_string(),
            ..SecurityConfig::default()
        },
    )
    .unwrap();

    writer
        .set("doc:1", b"payload".to_vec(), Duration::ZERO)
        .await
        .unwrap();

    let err = assert_err!(reader.get("doc:1").await);
    assert!(matches!(err, CacheError::Decryption(_)));
    assert!(!err.is_miss());
}

#[tokio::test]
async fn test_ttl_policy_full_cache_reports_cache_full() {
    let config = CacheConfig {
        max_items: 2,
        eviction: EvictionKind::Ttl,
        ..CacheConfig::default()
    };
    let cache = CacheFactory::create(&config).await.unwrap();

    assert_ok!(cache.set("a", vec![1], Duration::from_secs(60)).await);
    assert_ok!(cache.set("b", vec![2], Duration::from_secs(60)).await);

    let err = assert_err!(cache.set("c", vec![3], Duration::from_secs(60)).await);
    assert!(matches!(err, CacheError::CacheFull(_)));
    assert_ok!(cache.close().await);
}

#[tokio::test]
async fn test_closed_cache_rejects_operations() {
    let cache = CacheFactory::create(&CacheConfig::default()).await.unwrap();
    cache.set("k", vec![1], Duration::ZERO).await.unwrap();

    assert_ok!(cache.close().await);
    assert_ok!(cache.close().await);
    assert!(matches!(cache.get("k").await, Err(CacheError::Closed)));
}

#[tokio::test]
async fn test_cluster_backend_requires_addresses() {
    let config = CacheConfig {
        backend: BackendKind::RedisCluster,
        ..CacheConfig::default()
    };
    assert_err!(CacheFactory::create(&config).await);
}

#[tokio::test(start_paused = true)]
async fn test_warmer_keeps_encrypted_profile_fresh() {
    let config = encrypted_config();
    let monitor = Arc::new(CacheMonitor::new());
    let cache = CacheFactory::build(&config, monitor.clone()).await.unwrap();

    let loads = Arc::new(AtomicUsize::new(0));
    let warmer = CacheWarmer::new(cache.clone(), config.to_warmer_config());
    warmer.set_monitor(monitor.clone());
    {
        let loads = loads.clone();
        warmer.add_warming_job(
            "profile:7",
            move || {
                let n = loads.fetch_add(1, Ordering::SeqCst) as u32;
                async move {
                    Ok(Profile {
                        id: 7,
                        name: "ada".to_string(),
                        followers: 100 + n,
                    })
                }
            },
            Duration::from_secs(2),
            Duration::from_secs(30),
        );
    }

    let shutdown = CancellationToken::new();
    assert_ok!(warmer.start(&shutdown));

    // Nothing is loaded before the first tick
    assert!(!cache.exists("profile:7").await.unwrap());

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    warmer.stop().await;

    let refreshes = loads.load(Ordering::SeqCst);
    assert!(refreshes >= 2, "expected repeated refreshes, got {}", refreshes);

    let bytes = cache.get("profile:7").await.unwrap();
    let profile: Profile = JsonCodec.decode(&bytes).unwrap();
    assert_eq!(profile.id, 7);
    assert_eq!(profile.followers as usize, 100 + refreshes - 1);

    let status = &warmer.jobs()[0];
    assert_eq!(status.refresh_count as usize, refreshes);
    assert_eq!(status.failure_count, 0);

    // One set per refresh, counted once by the monitored chain
    let stats = monitor.namespace_stats("profile").unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.sets as usize, refreshes);

    // Stopping again is harmless, restarting is refused
    warmer.stop().await;
    assert!(matches!(warmer.start(&shutdown), Err(CacheError::Warmer(_))));

    cache.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_warmer_survives_failing_loader() {
    let config = encrypted_config();
    let cache = CacheFactory::build(&config, Arc::new(CacheMonitor::new()))
        .await
        .unwrap();

    let warmer = CacheWarmer::new(cache.clone(), config.to_warmer_config());
    warmer.add_warming_job(
        "feed:broken",
        || async { Err::<String, _>(anyhow::anyhow!("upstream unavailable")) },
        Duration::from_secs(1),
        Duration::from_secs(10),
    );
    warmer.add_warming_job(
        "feed:ok",
        || async { Ok("fresh".to_string()) },
        Duration::from_secs(1),
        Duration::from_secs(10),
    );

    let shutdown = CancellationToken::new();
    warmer.start(&shutdown).unwrap();
    tokio::time::sleep(Duration::from_millis(3_500)).await;

    // Cancelling the parent token stops the driver too
    shutdown.cancel();
    warmer.stop().await;

    let jobs = warmer.jobs();
    let broken = jobs.iter().find(|job| job.key == "feed:broken").unwrap();
    assert!(broken.failure_count >= 1);
    assert!(broken.last_error.as_deref().unwrap().contains("upstream unavailable"));

    let value: String = JsonCodec.decode(&cache.get("feed:ok").await.unwrap()).unwrap();
    assert_eq!(value, "fresh");
    assert!(cache.get("feed:broken").await.unwrap_err().is_miss());
}
