//! Persisted Cache Tier
//!
//! Slower, durable fallback consulted when the in-memory cache is cold (for
//! example right after a redeploy). Values are arbitrary JSON keyed by string.

mod file;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use file::FileCache;

/// A live persisted entry and how long it has left.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedHit {
    pub value: Value,
    pub ttl_remaining: Duration,
}

/// Durable key → JSON store with per-entry expiry.
#[async_trait]
pub trait PersistedCache: Send + Sync {
    /// Returns the stored value if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<PersistedHit>>;

    /// Stores `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()>;

    /// Drops expired entries. Returns the number removed.
    async fn purge_expired(&self) -> Result<usize>;
}
