//! Cache Store Module
//!
//! Process-wide key → JSON value map with per-entry TTL and lazy expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::cache::{CacheEntry, CacheStats, Clock, SystemClock};

/// Cache store shared by every handler and background task.
///
/// `get` needs the write half (lazy removal and stats), so most callers take
/// `write()`. Guards must be dropped before awaiting anything else.
pub type SharedCache = Arc<RwLock<CacheStore>>;

// == Cache Store ==
/// In-memory TTL cache. Entries live until their TTL elapses or they are
/// deleted; there is no capacity-based eviction.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Performance statistics
    stats: CacheStats,
    /// Time source for expiry checks
    clock: Arc<dyn Clock>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store driven by the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            clock,
        }
    }

    /// Wraps the store for sharing across tasks.
    pub fn shared(self) -> SharedCache {
        Arc::new(RwLock::new(self))
    }

    // == Set ==
    /// Stores a value under `key`, replacing any previous entry and its TTL.
    pub fn set(&mut self, key: impl Into<String>, value: Value, ttl: Duration) {
        let entry = CacheEntry::new(value, ttl, self.clock.now_ms());
        self.entries.insert(key.into(), entry);
        self.stats.set_total_entries(self.entries.len());
    }

    /// Minutes-based form of [`CacheStore::set`].
    pub fn set_minutes(&mut self, key: impl Into<String>, value: Value, ttl_minutes: u64) {
        self.set(key, value, Duration::from_secs(ttl_minutes.saturating_mul(60)));
    }

    // == Get ==
    /// Returns the value if present and not expired.
    ///
    /// An expired entry is removed on the spot and counted as a miss.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let now = self.clock.now_ms();

        match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                self.entries.remove(key);
                self.stats.record_expirations(1);
                self.stats.set_total_entries(self.entries.len());
                self.stats.record_miss();
                None
            }
            Some(entry) => {
                let value = entry.value.clone();
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    /// Removes every entry whose key starts with `prefix`.
    ///
    /// Returns the number of entries removed.
    pub fn delete_by_prefix(&mut self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        self.stats.set_total_entries(self.entries.len());
        before - self.entries.len()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));

        let removed = before - self.entries.len();
        self.stats.record_expirations(removed);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
