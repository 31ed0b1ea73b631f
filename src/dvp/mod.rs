//! Defense vs. Position
//!
//! Per-team tables of opponent production by position bucket, and rankings
//! across the league.

mod loader;
mod table;
mod teams;

pub use loader::{dvp_cache_key, load_team_table, parse_box_scores, DvpRequest};
pub use table::{
    rank_teams, BoxScoreLine, DvpTable, Metric, Position, RankingRow, MAX_SAMPLE_GAMES,
};
pub use teams::{all_teams, normalize_team, season_label, team_id, NBA_TEAMS};
