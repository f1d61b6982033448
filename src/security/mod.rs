//! Security Module
//!
//! Encryption, rate limiting and access control layered over a cache.

mod access;
mod encryptor;
mod rate_limit;
mod secure;

pub use access::{AccessPolicy, CacheOp, PrefixAccessPolicy};
pub use encryptor::{CacheEncryptor, NONCE_LEN, TAG_LEN};
pub use rate_limit::RateLimiter;
pub use secure::SecureCache;
