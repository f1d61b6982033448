//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use chrono::{DateTime, Utc};

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// `last_access` and `access_count` are bookkeeping owned by the eviction
/// policy; the backend never interprets them.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Key under which the entry is stored
    pub key: String,
    /// The stored value, opaque to the cache
    pub value: Vec<u8>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Time to live, zero = no expiration
    pub ttl: Duration,
    /// Expiration timestamp, None = no expiration
    pub expires_at: Option<DateTime<Utc>>,
    /// Logical recency stamp (LRU)
    pub last_access: u64,
    /// Number of recorded accesses (LFU)
    pub access_count: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry created now.
    pub fn new(key: impl Into<String>, value: Vec<u8>, ttl: Duration) -> Self {
        Self::created_at(key, value, ttl, Utc::now())
    }

    /// Creates an entry with an explicit creation time.
    pub fn created_at(
        key: impl Into<String>,
        value: Vec<u8>,
        ttl: Duration,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            value,
            created_at,
            ttl,
            expires_at: expiry_for(created_at, ttl),
            last_access: 0,
            access_count: 0,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Checks expiry against a caller-supplied clock reading.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has TTL and hasn't expired
    /// - `None` if the entry never expires
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at.map(|expires| {
            (expires - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO)
        })
    }
}

/// `created_at + ttl`, or None for a zero TTL or an unrepresentable deadline.
fn expiry_for(created_at: DateTime<Utc>, ttl: Duration) -> Option<DateTime<Utc>> {
    if ttl.is_zero() {
        return None;
    }
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|delta| created_at.checked_add_signed(delta))
}
