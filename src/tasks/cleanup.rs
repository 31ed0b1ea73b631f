//! TTL Cleanup Task
//!
//! Background task that periodically removes expired entries from the
//! in-memory cache and, when present, the persisted tier.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::SharedCache;
use crate::persist::PersistedCache;

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// Reads already drop expired entries lazily; this sweep bounds memory for
/// keys that are never read again.
///
/// # Arguments
/// * `cache` - shared in-memory cache
/// * `persisted` - optional persisted tier to purge on the same schedule
/// * `cleanup_interval_secs` - Interval in seconds between cleanup runs
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
pub fn spawn_cleanup_task(
    cache: SharedCache,
    persisted: Option<Arc<dyn PersistedCache>>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut cache_guard = cache.write().await;
                cache_guard.cleanup_expired()
            };

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }

            if let Some(persisted) = &persisted {
                match persisted.purge_expired().await {
                    Ok(0) => {}
                    Ok(purged) => info!("TTL cleanup: purged {} persisted entries", purged),
                    Err(e) => warn!(error = %e, "persisted cache purge failed"),
                }
            }
        }
    })
}
