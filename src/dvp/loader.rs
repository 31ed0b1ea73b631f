//! Loads DvP tables through the fetch orchestrator.

use serde_json::Value;
use tracing::info;

use super::{BoxScoreLine, DvpTable, Metric};
use crate::cache::{CacheKeyBuilder, TtlClass};
use crate::error::{AppError, Result};
use crate::fetch::{FetchOrchestrator, Upstream, UpstreamError};

/// Parameters for one team's table.
#[derive(Debug, Clone, Copy)]
pub struct DvpRequest<'a> {
    pub team: &'a str,
    pub season: i32,
    pub metric: Metric,
    pub games: usize,
    pub force_refresh: bool,
}

pub fn dvp_cache_key(team: &str, season: i32, metric: Metric, games: usize) -> String {
    CacheKeyBuilder::new("dvp")
        .scalar("team", Some(team))
        .scalar("season", Some(season))
        .scalar("metric", Some(metric))
        .scalar("games", Some(games))
        .build()
}

/// Reads box score lines from either `{"data": [...]}` or a bare array.
pub fn parse_box_scores(body: Value) -> std::result::Result<Vec<BoxScoreLine>, UpstreamError> {
    let rows = match body {
        Value::Object(mut map) => map.remove("data").unwrap_or(Value::Array(Vec::new())),
        other => other,
    };
    serde_json::from_value(rows).map_err(|e| UpstreamError::Decode(e.to_string()))
}

async fn load_season(
    orchestrator: &FetchOrchestrator,
    upstream: &dyn Upstream,
    req: DvpRequest<'_>,
    season: i32,
) -> Result<DvpTable> {
    let key = dvp_cache_key(req.team, season, req.metric, req.games);

    let fetched = orchestrator
        .fetch(&key, TtlClass::Rankings, req.force_refresh, || async move {
            let query = vec![
                ("team".to_string(), req.team.to_string()),
                ("season".to_string(), season.to_string()),
                ("per_page".to_string(), "500".to_string()),
            ];
            let body = upstream.get_json("box_scores", &query).await?;
            let lines = parse_box_scores(body)?;
            let table = DvpTable::build(req.team, season, req.metric, &lines, req.games);
            serde_json::to_value(table).map_err(|e| UpstreamError::Decode(e.to_string()))
        })
        .await?;

    serde_json::from_value(fetched.value)
        .map_err(|e| AppError::Internal(format!("cached DvP table unreadable: {}", e)))
}

/// Loads a team's table, falling back to the previous season when the
/// requested one has no processed games yet.
pub async fn load_team_table(
    orchestrator: &FetchOrchestrator,
    upstream: &dyn Upstream,
    req: DvpRequest<'_>,
) -> Result<DvpTable> {
    let table = load_season(orchestrator, upstream, req, req.season).await?;
    if table.sample_games > 0 {
        return Ok(table);
    }

    let Some(previous_season) = req.season.checked_sub(1) else {
        return Ok(table);
    };
    let previous = load_season(orchestrator, upstream, req, previous_season).await?;
    if previous.sample_games > 0 {
        info!(
            team = req.team,
            requested = req.season,
            used = previous.season,
            "no games yet, using previous season"
        );
        return Ok(previous);
    }
    Ok(table)
}
