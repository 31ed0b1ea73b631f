//! JSON file backend for the persisted cache tier.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{PersistedCache, PersistedHit};
use crate::cache::{Clock, SystemClock};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedEntry {
    value: Value,
    expires_at_ms: u64,
}

/// Whole-file JSON map, loaded once at open and rewritten on every change.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, PersistedEntry>>,
    clock: Arc<dyn Clock>,
}

impl FileCache {
    /// Opens (or starts) the cache file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock)).await
    }

    pub async fn open_with_clock(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AppError::Persistence(format!("corrupt cache file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(AppError::Persistence(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        info!(path = %path.display(), entries = entries.len(), "persisted cache opened");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            clock,
        })
    }

    async fn flush(&self, entries: &HashMap<String, PersistedEntry>) -> Result<()> {
        let bytes = serde_json::to_vec(entries)
            .map_err(|e| AppError::Persistence(format!("serialize failed: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Persistence(e.to_string()))?;
        }

        // Sibling write + rename: the cache file is never observed half-written.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }
}

#[async_trait]
impl PersistedCache for FileCache {
    async fn get(&self, key: &str) -> Result<Option<PersistedHit>> {
        let entries = self.entries.lock().await;
        let now = self.clock.now_ms();

        Ok(entries
            .get(key)
            .filter(|entry| now < entry.expires_at_ms)
            .map(|entry| PersistedHit {
                value: entry.value.clone(),
                ttl_remaining: Duration::from_millis(entry.expires_at_ms - now),
            }))
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let expires_at_ms = self
            .clock
            .now_ms()
            .saturating_add(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));

        // The live map only changes once the file holds the new state.
        let mut next = entries.clone();
        next.insert(
            key.to_string(),
            PersistedEntry {
                value: value.clone(),
                expires_at_ms,
            },
        );
        self.flush(&next).await?;
        *entries = next;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let mut entries = self.entries.lock().await;
        let now = self.clock.now_ms();

        let next: HashMap<String, PersistedEntry> = entries
            .iter()
            .filter(|(_, entry)| now < entry.expires_at_ms)
            .map(|(k, entry)| (k.clone(), entry.clone()))
            .collect();
        let removed = entries.len() - next.len();
        if removed > 0 {
            self.flush(&next).await?;
            *entries = next;
        }
        debug!(removed, "persisted cache purge");
        Ok(removed)
    }
}
