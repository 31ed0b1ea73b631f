//! Request and Response models for the gateway API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! query-string parsing and JSON response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{
    AdvancedStatsQuery, DvpParams, DvpQuery, DvpRankingsQuery, InvalidateQuery, OddsQuery,
    SeasonAveragesQuery, DEFAULT_DVP_GAMES, SEASON_RANGE,
};
pub use responses::{
    DataResponse, DvpResponse, HealthResponse, PrefetchFailure, PrefetchResponse,
    RankingsResponse, RemovedResponse, StatsResponse,
};
