//! Response DTOs for the gateway API
//!
//! Every body carries `success`; failures are rendered by `AppError`.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;
use crate::dvp::{DvpTable, Metric, Position, RankingRow};
use crate::fetch::{FetchSource, Fetched};
use crate::prefetch::PrefetchSummary;

/// Body for routes that return one upstream payload.
#[derive(Debug, Clone, Serialize)]
pub struct DataResponse {
    pub success: bool,
    pub data: Value,
    pub cache_key: String,
    pub source: FetchSource,
}

impl DataResponse {
    pub fn new(cache_key: impl Into<String>, fetched: Fetched) -> Self {
        Self {
            success: true,
            data: fetched.value,
            cache_key: cache_key.into(),
            source: fetched.source,
        }
    }
}

/// Body for `GET /api/dvp`
#[derive(Debug, Clone, Serialize)]
pub struct DvpResponse {
    pub success: bool,
    #[serde(flatten)]
    pub table: DvpTable,
}

impl DvpResponse {
    pub fn new(table: DvpTable) -> Self {
        Self {
            success: true,
            table,
        }
    }
}

/// Body for `GET /api/dvp/rankings`
#[derive(Debug, Clone, Serialize)]
pub struct RankingsResponse {
    pub success: bool,
    pub position: Position,
    pub metric: Metric,
    pub season: i32,
    pub rows: Vec<RankingRow>,
    /// Teams whose table could not be loaded
    pub missing: Vec<String>,
    pub summary: PrefetchSummary,
}

/// Body for prefetch routes
#[derive(Debug, Clone, Serialize)]
pub struct PrefetchResponse {
    pub success: bool,
    pub summary: PrefetchSummary,
    pub failures: Vec<PrefetchFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrefetchFailure {
    pub item: String,
    pub error: String,
}

/// Body for cache invalidation and purge routes
#[derive(Debug, Clone, Serialize)]
pub struct RemovedResponse {
    pub success: bool,
    pub removed: usize,
}

impl RemovedResponse {
    pub fn new(removed: usize) -> Self {
        Self {
            success: true,
            removed,
        }
    }
}

/// Body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub total_entries: usize,
    pub hit_rate: f64,
    pub persisted_tier: bool,
}

impl StatsResponse {
    pub fn new(stats: &CacheStats, persisted_tier: bool) -> Self {
        Self {
            success: true,
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
            persisted_tier,
        }
    }
}

/// Body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
