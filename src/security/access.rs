//! Key-level access control

use std::fmt;

/// Operation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    Read,
    Write,
    Delete,
}

impl fmt::Display for CacheOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheOp::Read => f.write_str("read"),
            CacheOp::Write => f.write_str("write"),
            CacheOp::Delete => f.write_str("delete"),
        }
    }
}

/// Decides whether an operation on a key is permitted. Evaluated before
/// any backend call.
pub trait AccessPolicy: Send + Sync + fmt::Debug {
    fn check(&self, op: CacheOp, key: &str) -> bool;
}

/// Allows keys starting with one of the configured prefixes. An empty
/// allow-list permits every non-empty key.
#[derive(Debug, Clone, Default)]
pub struct PrefixAccessPolicy {
    prefixes: Vec<String>,
}

impl PrefixAccessPolicy {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl AccessPolicy for PrefixAccessPolicy {
    fn check(&self, _op: CacheOp, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        self.prefixes.is_empty() || self.prefixes.iter().any(|prefix| key.starts_with(prefix.as_str()))
    }
}
