//! Defense-vs-position aggregation and ranking.
//!
//! A team's DvP table is what its opponents produced against it, split by the
//! opponent player's position bucket and averaged over sampled games.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Games sampled per table, upper bound.
pub const MAX_SAMPLE_GAMES: usize = 50;

// == Position ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    PG,
    SG,
    SF,
    PF,
    C,
}

impl Position {
    pub const ALL: [Position; 5] = [
        Position::PG,
        Position::SG,
        Position::SF,
        Position::PF,
        Position::C,
    ];
}

impl FromStr for Position {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PG" => Ok(Position::PG),
            "SG" => Ok(Position::SG),
            "SF" => Ok(Position::SF),
            "PF" => Ok(Position::PF),
            "C" => Ok(Position::C),
            other => Err(AppError::InvalidRequest(format!(
                "Unknown position '{}', expected PG, SG, SF, PF or C",
                other
            ))),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// == Metric ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Pts,
    Reb,
    Ast,
    Fg3m,
    Stl,
    Blk,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Pts => "pts",
            Metric::Reb => "reb",
            Metric::Ast => "ast",
            Metric::Fg3m => "fg3m",
            Metric::Stl => "stl",
            Metric::Blk => "blk",
        }
    }
}

impl FromStr for Metric {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pts" => Ok(Metric::Pts),
            "reb" => Ok(Metric::Reb),
            "ast" => Ok(Metric::Ast),
            "fg3m" => Ok(Metric::Fg3m),
            "stl" => Ok(Metric::Stl),
            "blk" => Ok(Metric::Blk),
            other => Err(AppError::InvalidRequest(format!("Unknown metric '{}'", other))),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Box Score Line ==
/// One player's line in one game, as returned by the box score endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxScoreLine {
    pub game_id: String,
    pub team: String,
    pub player: String,
    /// Starting slot from the box score (`G`, `F`, `C` or blank for bench)
    pub start_position: Option<String>,
    /// Depth chart bucket, when known
    pub position: Option<String>,
    pub pts: f64,
    pub reb: f64,
    pub ast: f64,
    pub fg3m: f64,
    pub stl: f64,
    pub blk: f64,
}

impl BoxScoreLine {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Pts => self.pts,
            Metric::Reb => self.reb,
            Metric::Ast => self.ast,
            Metric::Fg3m => self.fg3m,
            Metric::Stl => self.stl,
            Metric::Blk => self.blk,
        }
    }

    /// Position bucket: depth chart first, then a box score heuristic.
    pub fn bucket(&self) -> Position {
        if let Some(pos) = self.position.as_deref().and_then(|p| p.parse().ok()) {
            return pos;
        }

        match self
            .start_position
            .as_deref()
            .map(|s| s.trim().to_ascii_uppercase())
            .as_deref()
        {
            Some("G") if self.ast >= 5.0 => Position::PG,
            Some("G") => Position::SG,
            Some("F") if self.reb >= 8.0 || self.blk >= 2.0 => Position::PF,
            Some("F") => Position::SF,
            Some("C") => Position::C,
            _ if self.reb >= 7.0 => Position::PF,
            _ => Position::C,
        }
    }
}

// == DvP Table ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DvpTable {
    pub team: String,
    /// League identifier for `team`, when it is a known franchise
    #[serde(default)]
    pub team_id: Option<u32>,
    /// Season start year the numbers come from
    pub season: i32,
    pub season_label: String,
    pub metric: Metric,
    pub sample_games: usize,
    pub per_game: BTreeMap<Position, f64>,
    pub totals: BTreeMap<Position, f64>,
}

impl DvpTable {
    /// Aggregates opponent production against `team`.
    ///
    /// `lines` is expected newest game first; only the first `max_games`
    /// distinct games are sampled and games without an opponent line are
    /// skipped.
    pub fn build(
        team: &str,
        season: i32,
        metric: Metric,
        lines: &[BoxScoreLine],
        max_games: usize,
    ) -> Self {
        let max_games = max_games.clamp(1, MAX_SAMPLE_GAMES);

        let mut game_order: Vec<&str> = Vec::new();
        let mut by_game: BTreeMap<&str, Vec<&BoxScoreLine>> = BTreeMap::new();
        for line in lines {
            let game = by_game.entry(line.game_id.as_str()).or_default();
            if game.is_empty() {
                game_order.push(line.game_id.as_str());
            }
            game.push(line);
        }

        let mut totals: BTreeMap<Position, f64> =
            Position::ALL.iter().map(|p| (*p, 0.0)).collect();
        let mut processed = 0usize;

        for game_id in game_order.into_iter().take(max_games) {
            let opponents: Vec<&&BoxScoreLine> = by_game[game_id]
                .iter()
                .filter(|l| !l.team.eq_ignore_ascii_case(team))
                .collect();
            if opponents.is_empty() {
                continue;
            }

            for line in opponents {
                let value = line.value(metric);
                if value == 0.0 {
                    continue;
                }
                *totals.entry(line.bucket()).or_insert(0.0) += value;
            }
            processed += 1;
        }

        let per_game = totals
            .iter()
            .map(|(pos, total)| {
                let avg = if processed > 0 {
                    total / processed as f64
                } else {
                    0.0
                };
                (*pos, avg)
            })
            .collect();

        Self {
            team: team.to_string(),
            team_id: super::team_id(team),
            season,
            season_label: super::season_label(season),
            metric,
            sample_games: processed,
            per_game,
            totals,
        }
    }

    pub fn per_game_at(&self, position: Position) -> f64 {
        self.per_game.get(&position).copied().unwrap_or(0.0)
    }
}

// == Ranking ==
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRow {
    pub rank: usize,
    pub team: String,
    pub value: f64,
    pub sample_games: usize,
}

/// Ranks teams by what they concede at `position`; rank 1 concedes the most.
pub fn rank_teams(tables: &[DvpTable], position: Position) -> Vec<RankingRow> {
    let mut rows: Vec<RankingRow> = tables
        .iter()
        .map(|t| RankingRow {
            rank: 0,
            team: t.team.clone(),
            value: t.per_game_at(position),
            sample_games: t.sample_games,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| a.team.cmp(&b.team))
    });
    for (idx, row) in rows.iter_mut().enumerate() {
        row.rank = idx + 1;
    }
    rows
}
