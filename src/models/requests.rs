//! Query-string DTOs for the gateway API
//!
//! Each query struct validates itself before any upstream call is made.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::cache::parse_id_list;
use crate::dvp::{normalize_team, Metric, Position, MAX_SAMPLE_GAMES};
use crate::error::{AppError, Result};

/// Default number of games sampled for DvP tables.
pub const DEFAULT_DVP_GAMES: usize = 20;

fn required_ids(raw: Option<&str>) -> Result<Vec<i64>> {
    let ids = parse_id_list(raw.unwrap_or_default())?;
    if ids.is_empty() {
        return Err(AppError::InvalidRequest(
            "player_ids is required".to_string(),
        ));
    }
    Ok(ids)
}

/// Seasons the league has existed for, with headroom.
pub const SEASON_RANGE: std::ops::RangeInclusive<i32> = 1946..=2100;

fn checked_season(season: i32) -> Result<i32> {
    if SEASON_RANGE.contains(&season) {
        Ok(season)
    } else {
        Err(AppError::InvalidRequest(format!(
            "season must be between {} and {}",
            SEASON_RANGE.start(),
            SEASON_RANGE.end()
        )))
    }
}

fn required_season(season: Option<i32>) -> Result<i32> {
    season
        .ok_or_else(|| AppError::InvalidRequest("season is required".to_string()))
        .and_then(checked_season)
}

/// `GET /api/stats/advanced`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdvancedStatsQuery {
    pub player_ids: Option<String>,
    pub season: Option<i32>,
    pub postseason: Option<bool>,
    #[serde(default)]
    pub refresh: bool,
}

impl AdvancedStatsQuery {
    pub fn player_ids(&self) -> Result<Vec<i64>> {
        required_ids(self.player_ids.as_deref())
    }

    /// Optional season, range-checked when present.
    pub fn season(&self) -> Result<Option<i32>> {
        self.season.map(checked_season).transpose()
    }
}

/// `GET /api/stats/season-averages` and `POST /api/prefetch/season-averages`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeasonAveragesQuery {
    pub player_ids: Option<String>,
    pub season: Option<i32>,
    #[serde(default)]
    pub refresh: bool,
}

impl SeasonAveragesQuery {
    pub fn validate(&self) -> Result<(Vec<i64>, i32)> {
        Ok((
            required_ids(self.player_ids.as_deref())?,
            required_season(self.season)?,
        ))
    }
}

/// `GET /api/odds`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OddsQuery {
    /// `YYYY-MM-DD`; today (UTC) when omitted
    pub date: Option<String>,
    #[serde(default)]
    pub refresh: bool,
}

impl OddsQuery {
    pub fn date(&self) -> Result<NaiveDate> {
        match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                AppError::InvalidRequest(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
            }),
            None => Ok(chrono::Utc::now().date_naive()),
        }
    }
}

/// `GET /api/dvp`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DvpQuery {
    pub team: Option<String>,
    pub season: Option<i32>,
    pub metric: Option<String>,
    pub games: Option<usize>,
    #[serde(default)]
    pub refresh: bool,
}

/// Validated DvP parameters shared by the table and ranking routes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DvpParams {
    pub season: i32,
    pub metric: Metric,
    pub games: usize,
}

fn dvp_params(season: Option<i32>, metric: Option<&str>, games: Option<usize>) -> Result<DvpParams> {
    let metric: Metric = match metric {
        Some(raw) => raw.parse()?,
        None => Metric::default(),
    };
    Ok(DvpParams {
        season: required_season(season)?,
        metric,
        games: games.unwrap_or(DEFAULT_DVP_GAMES).clamp(1, MAX_SAMPLE_GAMES),
    })
}

impl DvpQuery {
    pub fn validate(&self) -> Result<(&'static str, DvpParams)> {
        let team = self
            .team
            .as_deref()
            .ok_or_else(|| AppError::InvalidRequest("team is required".to_string()))?;
        Ok((
            normalize_team(team)?,
            dvp_params(self.season, self.metric.as_deref(), self.games)?,
        ))
    }
}

/// `GET /api/dvp/rankings`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DvpRankingsQuery {
    pub position: Option<String>,
    pub season: Option<i32>,
    pub metric: Option<String>,
    pub games: Option<usize>,
}

impl DvpRankingsQuery {
    pub fn validate(&self) -> Result<(Position, DvpParams)> {
        let position: Position = self
            .position
            .as_deref()
            .ok_or_else(|| AppError::InvalidRequest("position is required".to_string()))?
            .parse()?;
        Ok((
            position,
            dvp_params(self.season, self.metric.as_deref(), self.games)?,
        ))
    }
}

/// `DELETE /api/cache`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateQuery {
    pub prefix: Option<String>,
}

impl InvalidateQuery {
    pub fn prefix(&self) -> Result<&str> {
        self.prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::InvalidRequest("prefix is required".to_string()))
    }
}
