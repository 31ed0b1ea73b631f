//! API Handlers
//!
//! Thin HTTP handlers: validate the query, build a cache key, resolve through
//! the fetch orchestrator. Every failure leaves as the JSON error envelope.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde_json::Value;

use crate::cache::{CacheKeyBuilder, CacheStore, SharedCache, TtlClass};
use crate::config::Config;
use crate::dvp::{all_teams, load_team_table, rank_teams, DvpRequest, DvpTable};
use crate::error::{AppError, Result};
use crate::fetch::{FetchOrchestrator, Fetched, HttpUpstream, Upstream};
use crate::models::{
    AdvancedStatsQuery, DataResponse, DvpQuery, DvpRankingsQuery, DvpResponse, HealthResponse,
    InvalidateQuery, OddsQuery, PrefetchFailure, PrefetchResponse, RankingsResponse,
    RemovedResponse, SeasonAveragesQuery, StatsResponse,
};
use crate::persist::FileCache;
use crate::prefetch::BatchPrefetcher;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide in-memory cache
    pub cache: SharedCache,
    pub orchestrator: FetchOrchestrator,
    pub upstream: Arc<dyn Upstream>,
    pub prefetcher: BatchPrefetcher,
}

impl AppState {
    /// Creates a new AppState around an orchestrator and upstream.
    pub fn new(
        orchestrator: FetchOrchestrator,
        upstream: Arc<dyn Upstream>,
        prefetcher: BatchPrefetcher,
    ) -> Self {
        Self {
            cache: orchestrator.cache().clone(),
            orchestrator,
            upstream,
            prefetcher,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens the persisted tier when the environment allows it.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let cache = CacheStore::new().shared();
        let mut orchestrator = FetchOrchestrator::new(cache, config.retry_policy());

        if let Some(path) = config.persisted_cache_enabled() {
            let persisted = FileCache::open(path).await?;
            orchestrator = orchestrator.with_persisted(Arc::new(persisted));
        }

        let upstream = HttpUpstream::new(
            config.stats_api_base_url.clone(),
            config.stats_api_key.clone(),
            config.upstream_timeout(),
        )?;

        Ok(Self::new(
            orchestrator,
            Arc::new(upstream),
            BatchPrefetcher::new(config.adaptive_policy()),
        ))
    }
}

fn parse_query<T>(query: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    query
        .map(|Query(q)| q)
        .map_err(|e| AppError::InvalidRequest(e.body_text()))
}

fn array_param(name: &str, values: &[i64]) -> Vec<(String, String)> {
    values
        .iter()
        .map(|v| (format!("{}[]", name), v.to_string()))
        .collect()
}

fn sorted_ids(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

async fn fetch_season_averages(
    state: &AppState,
    ids: &[i64],
    season: i32,
    refresh: bool,
) -> Result<(String, Fetched)> {
    let ids = sorted_ids(ids);
    let key = CacheKeyBuilder::new("season_averages")
        .ids("players", &ids)
        .scalar("season", Some(season))
        .build();

    let mut query = vec![("season".to_string(), season.to_string())];
    query.extend(array_param("player_ids", &ids));

    let upstream = state.upstream.as_ref();
    let fetched = state
        .orchestrator
        .fetch(&key, TtlClass::PlayerStats, refresh, || {
            upstream.get_json("season_averages", &query)
        })
        .await?;
    Ok((key, fetched))
}

/// Handler for GET /api/stats/advanced
pub async fn advanced_stats_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<AdvancedStatsQuery>, QueryRejection>,
) -> Result<Json<DataResponse>> {
    let req = parse_query(query)?;
    let ids = sorted_ids(&req.player_ids()?);
    let season = req.season()?;

    let key = CacheKeyBuilder::new("advanced_stats")
        .ids("players", &ids)
        .scalar("season", season)
        .flag("postseason", req.postseason)
        .build();

    let mut params = array_param("player_ids", &ids);
    if let Some(season) = season {
        params.push(("seasons[]".to_string(), season.to_string()));
    }
    if let Some(postseason) = req.postseason {
        params.push(("postseason".to_string(), postseason.to_string()));
    }

    let upstream = state.upstream.as_ref();
    let fetched = state
        .orchestrator
        .fetch(&key, TtlClass::AdvancedStats, req.refresh, || {
            upstream.get_json("stats/advanced", &params)
        })
        .await?;

    Ok(Json(DataResponse::new(key, fetched)))
}

/// Handler for GET /api/stats/season-averages
pub async fn season_averages_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<SeasonAveragesQuery>, QueryRejection>,
) -> Result<Json<DataResponse>> {
    let req = parse_query(query)?;
    let (ids, season) = req.validate()?;

    let (key, fetched) = fetch_season_averages(&state, &ids, season, req.refresh).await?;
    Ok(Json(DataResponse::new(key, fetched)))
}

/// Handler for GET /api/odds
///
/// A date with no lines is reported as 404.
pub async fn odds_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<OddsQuery>, QueryRejection>,
) -> Result<Json<DataResponse>> {
    let req = parse_query(query)?;
    let date = req.date()?.format("%Y-%m-%d").to_string();

    let key = CacheKeyBuilder::new("odds")
        .scalar("date", Some(&date))
        .build();
    let params = vec![("date".to_string(), date.clone())];

    let upstream = state.upstream.as_ref();
    let fetched = state
        .orchestrator
        .fetch(&key, TtlClass::Odds, req.refresh, || {
            upstream.get_json("odds", &params)
        })
        .await?;

    let empty = match &fetched.value {
        Value::Array(rows) => rows.is_empty(),
        Value::Object(map) => map
            .get("data")
            .and_then(Value::as_array)
            .is_some_and(|rows| rows.is_empty()),
        _ => false,
    };
    if empty {
        return Err(AppError::NotFound(format!("No odds for {}", date)));
    }

    Ok(Json(DataResponse::new(key, fetched)))
}

/// Handler for GET /api/dvp
pub async fn dvp_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<DvpQuery>, QueryRejection>,
) -> Result<Json<DvpResponse>> {
    let req = parse_query(query)?;
    let (team, params) = req.validate()?;

    let table = load_team_table(
        &state.orchestrator,
        state.upstream.as_ref(),
        DvpRequest {
            team,
            season: params.season,
            metric: params.metric,
            games: params.games,
            force_refresh: req.refresh,
        },
    )
    .await?;

    Ok(Json(DvpResponse::new(table)))
}

/// Handler for GET /api/dvp/rankings
///
/// Loads every team's table through the batch prefetcher, then ranks.
pub async fn dvp_rankings_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<DvpRankingsQuery>, QueryRejection>,
) -> Result<Json<RankingsResponse>> {
    let req = parse_query(query)?;
    let (position, params) = req.validate()?;

    let orchestrator = &state.orchestrator;
    let upstream = state.upstream.as_ref();
    let outcome = state
        .prefetcher
        .run(all_teams(), |team| async move {
            load_team_table(
                orchestrator,
                upstream,
                DvpRequest {
                    team,
                    season: params.season,
                    metric: params.metric,
                    games: params.games,
                    force_refresh: false,
                },
            )
            .await
        })
        .await;

    if outcome.results.is_empty() {
        return Err(AppError::Upstream {
            status: None,
            message: format!(
                "no DvP tables could be loaded ({} teams failed)",
                outcome.failures.len()
            ),
        });
    }

    let tables: Vec<DvpTable> = outcome.results.into_iter().map(|(_, t)| t).collect();
    Ok(Json(RankingsResponse {
        success: true,
        position,
        metric: params.metric,
        season: params.season,
        rows: rank_teams(&tables, position),
        missing: outcome
            .failures
            .into_iter()
            .map(|(team, _)| team.to_string())
            .collect(),
        summary: outcome.summary,
    }))
}

/// Handler for POST /api/prefetch/season-averages
///
/// Warms one cache entry per player.
pub async fn prefetch_season_averages_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<SeasonAveragesQuery>, QueryRejection>,
) -> Result<Json<PrefetchResponse>> {
    let req = parse_query(query)?;
    let (ids, season) = req.validate()?;

    let state_ref = &state;
    let refresh = req.refresh;
    let outcome = state
        .prefetcher
        .run(sorted_ids(&ids), |id| async move {
            fetch_season_averages(state_ref, &[id], season, refresh).await
        })
        .await;

    Ok(Json(PrefetchResponse {
        success: true,
        summary: outcome.summary,
        failures: outcome
            .failures
            .into_iter()
            .map(|(id, error)| PrefetchFailure {
                item: id.to_string(),
                error,
            })
            .collect(),
    }))
}

/// Handler for DELETE /api/cache
pub async fn invalidate_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<InvalidateQuery>, QueryRejection>,
) -> Result<Json<RemovedResponse>> {
    let req = parse_query(query)?;
    let prefix = req.prefix()?;

    let removed = state.cache.write().await.delete_by_prefix(prefix);
    tracing::info!(prefix, removed, "cache invalidated");

    Ok(Json(RemovedResponse::new(removed)))
}

/// Handler for POST /api/cache/persisted/purge
///
/// 503 when the persisted tier is not available in this environment.
pub async fn purge_persisted_handler(
    State(state): State<AppState>,
) -> Result<Json<RemovedResponse>> {
    let persisted = state.orchestrator.persisted().ok_or_else(|| {
        AppError::EnvironmentUnsupported(
            "persisted cache requires a local filesystem and is disabled".to_string(),
        )
    })?;

    let removed = persisted.purge_expired().await?;
    Ok(Json(RemovedResponse::new(removed)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.read().await.stats();
    Json(StatsResponse::new(
        &stats,
        state.orchestrator.persisted().is_some(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
