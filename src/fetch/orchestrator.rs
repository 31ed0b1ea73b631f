//! Fetch Orchestrator
//!
//! Cache-aside resolution of one logical request: memory, then the persisted
//! tier, then the live upstream with 429 backoff. Only successes are cached.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{SharedCache, TtlClass};
use crate::error::Result;
use crate::fetch::{RetryPolicy, UpstreamError};
use crate::persist::{PersistedCache, PersistedHit};

/// Where a fetched value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchSource {
    Memory,
    Persisted,
    Upstream,
}

/// A resolved value plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub value: Value,
    pub source: FetchSource,
    /// Upstream calls made (0 for cache hits)
    pub attempts: u32,
}

// == Fetch Orchestrator ==
#[derive(Clone)]
pub struct FetchOrchestrator {
    cache: SharedCache,
    persisted: Option<Arc<dyn PersistedCache>>,
    retry: RetryPolicy,
}

impl FetchOrchestrator {
    pub fn new(cache: SharedCache, retry: RetryPolicy) -> Self {
        Self {
            cache,
            persisted: None,
            retry,
        }
    }

    /// Adds a persisted fallback tier.
    pub fn with_persisted(mut self, persisted: Arc<dyn PersistedCache>) -> Self {
        self.persisted = Some(persisted);
        self
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn persisted(&self) -> Option<&Arc<dyn PersistedCache>> {
        self.persisted.as_ref()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Resolves `key`, calling `upstream` only when no cache tier can answer
    /// (or when `force_refresh` is set).
    pub async fn fetch<F, Fut>(
        &self,
        key: &str,
        ttl: TtlClass,
        force_refresh: bool,
        upstream: F,
    ) -> Result<Fetched>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<Value, UpstreamError>>,
    {
        if !force_refresh {
            if let Some(hit) = self.lookup(key, ttl).await {
                return Ok(hit);
            }
        }

        let (value, attempts) = self.retry.run(key, upstream).await?;
        self.store(key, ttl, &value).await;

        info!(key, attempts, ?ttl, "fetched from upstream");
        Ok(Fetched {
            value,
            source: FetchSource::Upstream,
            attempts,
        })
    }

    async fn lookup(&self, key: &str, ttl: TtlClass) -> Option<Fetched> {
        // Guard is released at the end of this statement.
        let memory = self.cache.write().await.get(key);
        if let Some(value) = memory {
            debug!(key, "memory cache hit");
            return Some(Fetched {
                value,
                source: FetchSource::Memory,
                attempts: 0,
            });
        }

        let persisted = self.persisted.as_ref()?;
        match persisted.get(key).await {
            Ok(Some(PersistedHit {
                value,
                ttl_remaining,
            })) => {
                debug!(key, "persisted cache hit, promoting");
                // Never outlive the persisted entry.
                let promoted_ttl = ttl_remaining.min(ttl.ttl());
                self.cache.write().await.set(key, value.clone(), promoted_ttl);
                Some(Fetched {
                    value,
                    source: FetchSource::Persisted,
                    attempts: 0,
                })
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "persisted cache read failed");
                None
            }
        }
    }

    async fn store(&self, key: &str, ttl: TtlClass, value: &Value) {
        self.cache.write().await.set(key, value.clone(), ttl.ttl());

        if let Some(persisted) = &self.persisted {
            if let Err(e) = persisted.set(key, value, ttl.ttl()).await {
                warn!(key, error = %e, "persisted cache write failed");
            }
        }
    }
}
