//! Static NBA team table.

use crate::error::{AppError, Result};

/// Abbreviation → NBA stats team id.
pub const NBA_TEAMS: [(&str, u32); 30] = [
    ("ATL", 1610612737),
    ("BOS", 1610612738),
    ("BKN", 1610612751),
    ("CHA", 1610612766),
    ("CHI", 1610612741),
    ("CLE", 1610612739),
    ("DAL", 1610612742),
    ("DEN", 1610612743),
    ("DET", 1610612765),
    ("GSW", 1610612744),
    ("HOU", 1610612745),
    ("IND", 1610612754),
    ("LAC", 1610612746),
    ("LAL", 1610612747),
    ("MEM", 1610612763),
    ("MIA", 1610612748),
    ("MIL", 1610612749),
    ("MIN", 1610612750),
    ("NOP", 1610612740),
    ("NYK", 1610612752),
    ("OKC", 1610612760),
    ("ORL", 1610612753),
    ("PHI", 1610612755),
    ("PHX", 1610612756),
    ("POR", 1610612757),
    ("SAC", 1610612758),
    ("SAS", 1610612759),
    ("TOR", 1610612761),
    ("UTA", 1610612762),
    ("WAS", 1610612764),
];

pub fn team_id(abbr: &str) -> Option<u32> {
    NBA_TEAMS
        .iter()
        .find(|(a, _)| a.eq_ignore_ascii_case(abbr))
        .map(|(_, id)| *id)
}

/// Canonical upper-case abbreviation, or a client error for unknown teams.
pub fn normalize_team(raw: &str) -> Result<&'static str> {
    let trimmed = raw.trim();
    NBA_TEAMS
        .iter()
        .find(|(a, _)| a.eq_ignore_ascii_case(trimmed))
        .map(|(a, _)| *a)
        .ok_or_else(|| AppError::InvalidRequest(format!("Unknown team: {}", trimmed)))
}

pub fn all_teams() -> Vec<&'static str> {
    NBA_TEAMS.iter().map(|(a, _)| *a).collect()
}

/// `2025` → `"2025-26"`.
pub fn season_label(start_year: i32) -> String {
    format!("{}-{:02}", start_year, start_year.wrapping_add(1).rem_euclid(100))
}
