//! TTL classes by data volatility.

use std::time::Duration;

use serde::Serialize;

/// Category of cached data. Each category maps to one TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlClass {
    /// Live betting lines
    Odds,
    /// Box scores and season averages that still move during a season
    PlayerStats,
    /// DvP tables and rankings
    Rankings,
    /// Advanced stats for completed games
    AdvancedStats,
}

impl TtlClass {
    /// All classes, most volatile first.
    pub const ALL: [TtlClass; 4] = [
        TtlClass::Odds,
        TtlClass::PlayerStats,
        TtlClass::Rankings,
        TtlClass::AdvancedStats,
    ];

    pub const fn minutes(self) -> u64 {
        match self {
            TtlClass::Odds => 5,
            TtlClass::PlayerStats => 30,
            TtlClass::Rankings => 6 * 60,
            TtlClass::AdvancedStats => 24 * 60,
        }
    }

    pub const fn ttl(self) -> Duration {
        Duration::from_secs(self.minutes() * 60)
    }
}
