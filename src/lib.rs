//! warmcache - a production caching engine
//!
//! Pluggable backends (in-memory with LRU/LFU/TTL eviction, Redis Cluster),
//! proactive cache warming, per-namespace monitoring and an optional
//! security layer with encryption, access control and rate limiting.

pub mod api;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod security;
pub mod tasks;

pub use api::AppState;
pub use cache::{Cache, CacheFactory, CacheMonitor};
pub use config::ProductionConfig;
pub use error::{CacheError, Result};
pub use tasks::CacheWarmer;
