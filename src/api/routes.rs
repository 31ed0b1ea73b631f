//! API Routes
//!
//! Configures the Axum router with all gateway endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    advanced_stats_handler, dvp_handler, dvp_rankings_handler, health_handler,
    invalidate_handler, odds_handler, prefetch_season_averages_handler, purge_persisted_handler,
    season_averages_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - In-memory cache statistics
/// - `GET /api/stats/advanced` - Advanced player stats
/// - `GET /api/stats/season-averages` - Season averages
/// - `GET /api/odds` - Betting odds for a date
/// - `GET /api/dvp` - Defense-vs-position table for one team
/// - `GET /api/dvp/rankings` - League-wide DvP ranking for a position
/// - `POST /api/prefetch/season-averages` - Warm season averages in batches
/// - `DELETE /api/cache` - Invalidate keys by prefix
/// - `POST /api/cache/persisted/purge` - Drop expired persisted entries
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/api/stats/advanced", get(advanced_stats_handler))
        .route("/api/stats/season-averages", get(season_averages_handler))
        .route("/api/odds", get(odds_handler))
        .route("/api/dvp", get(dvp_handler))
        .route("/api/dvp/rankings", get(dvp_rankings_handler))
        .route(
            "/api/prefetch/season-averages",
            post(prefetch_season_averages_handler),
        )
        .route("/api/cache", delete(invalidate_handler))
        .route("/api/cache/persisted/purge", post(purge_persisted_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
