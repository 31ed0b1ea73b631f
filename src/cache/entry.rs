//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use serde_json::Value;

// == Cache Entry ==
/// A cached upstream result with its expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored JSON value
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry that expires `ttl` after `now_ms`.
    pub fn new(value: Value, ttl: Duration, now_ms: u64) -> Self {
        Self {
            value,
            created_at: now_ms,
            expires_at: now_ms.saturating_add(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// the expiration time, so a TTL of `t` serves the value for any elapsed
    /// time strictly below `t`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new(json!({"a": 1}), Duration::from_secs(60), 1_000);

        assert_eq!(entry.value, json!({"a": 1}));
        assert_eq!(entry.created_at, 1_000);
        assert_eq!(entry.expires_at, 61_000);
        assert!(!entry.is_expired(1_000));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new(json!(1), Duration::from_secs(60), 0);

        assert!(!entry.is_expired(59_999));
        assert!(entry.is_expired(60_000), "Entry should be expired at boundary");
        assert!(entry.is_expired(60_001));
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let entry = CacheEntry::new(json!(null), Duration::ZERO, 500);
        assert!(entry.is_expired(500));
    }
}
