//! Integration Tests for API Endpoints
//!
//! Drives the router end to end, against in-process upstream stubs and a
//! local HTTP stub for the reqwest client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use courtside::{
    cache::CacheStore,
    create_router,
    dvp::all_teams,
    fetch::{FetchOrchestrator, HttpUpstream, RetryPolicy, Upstream, UpstreamError},
    persist::FileCache,
    prefetch::{AdaptivePolicy, BatchPrefetcher},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
    }
}

fn fast_prefetcher() -> BatchPrefetcher {
    BatchPrefetcher::new(AdaptivePolicy {
        initial_delay: Duration::from_millis(1),
        min_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(10),
        ..AdaptivePolicy::default()
    })
}

fn state_with(upstream: Arc<dyn Upstream>, orchestrator: FetchOrchestrator) -> AppState {
    AppState::new(orchestrator, upstream, fast_prefetcher())
}

fn memory_orchestrator() -> FetchOrchestrator {
    FetchOrchestrator::new(CacheStore::new().shared(), fast_retry())
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// == In-process Upstream Stubs ==

/// Echoes the request and counts calls.
#[derive(Default)]
struct RecordingUpstream {
    calls: AtomicUsize,
}

#[async_trait]
impl Upstream for RecordingUpstream {
    async fn get_json(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let query: Vec<Value> = query.iter().map(|(k, v)| json!([k, v])).collect();
        Ok(json!({ "data": [{ "path": path, "query": query }] }))
    }
}

/// Serves one game per team per season; the opponent's center scores
/// more against teams later in the alphabet.
struct BoxScoreUpstream {
    failing_team: Option<&'static str>,
    empty_season: Option<i32>,
}

#[async_trait]
impl Upstream for BoxScoreUpstream {
    async fn get_json(
        &self,
        _path: &str,
        query: &[(String, String)],
    ) -> Result<Value, UpstreamError> {
        let param = |name: &str| {
            query
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        let team = param("team");
        let season: i32 = param("season").parse().unwrap_or_default();

        if self.failing_team == Some(team.as_str()) {
            return Err(UpstreamError::Status {
                status: 500,
                message: "boom".into(),
            });
        }
        if self.empty_season == Some(season) {
            return Ok(json!({ "data": [] }));
        }

        let index = all_teams().iter().position(|t| *t == team).unwrap_or(0);
        Ok(json!({ "data": [
            { "game_id": "g1", "team": team, "player": "home", "pts": 30.0 },
            { "game_id": "g1", "team": "OPP", "player": "big", "position": "C",
              "pts": 10.0 + index as f64, "reb": 9.0 }
        ]}))
    }
}

// == Cache-aside Endpoint Tests ==

#[tokio::test]
async fn test_reordered_ids_share_one_cache_entry() {
    let upstream = Arc::new(RecordingUpstream::default());
    let app = create_router(state_with(upstream.clone(), memory_orchestrator()));

    let (status, first) = send(
        &app,
        "GET",
        "/api/stats/advanced?player_ids=5,3,3&season=2024&postseason=false",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["source"], "upstream");
    assert_eq!(
        first["cache_key"],
        "advanced_stats:players_3,5:postseason_false:season_2024"
    );

    let (status, second) = send(
        &app,
        "GET",
        "/api/stats/advanced?player_ids=3,5&season=2024&postseason=false",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["source"], "memory");
    assert_eq!(second["data"], first["data"]);
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refresh_bypasses_cache() {
    let upstream = Arc::new(RecordingUpstream::default());
    let app = create_router(state_with(upstream.clone(), memory_orchestrator()));

    send(&app, "GET", "/api/stats/season-averages?player_ids=1&season=2024").await;
    let (_, body) = send(
        &app,
        "GET",
        "/api/stats/season-averages?player_ids=1&season=2024&refresh=true",
    )
    .await;

    assert_eq!(body["source"], "upstream");
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_missing_param_is_rejected_before_upstream() {
    let upstream = Arc::new(RecordingUpstream::default());
    let app = create_router(state_with(upstream.clone(), memory_orchestrator()));

    let (status, body) = send(&app, "GET", "/api/stats/advanced?season=2024").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stats_track_hits_and_misses() {
    let upstream = Arc::new(RecordingUpstream::default());
    let app = create_router(state_with(upstream, memory_orchestrator()));

    send(&app, "GET", "/api/odds?date=2025-01-15").await;
    send(&app, "GET", "/api/odds?date=2025-01-15").await;

    let (status, stats) = send(&app, "GET", "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 1);
    assert_eq!(stats["total_entries"], 1);
}

#[tokio::test]
async fn test_invalidate_by_prefix() {
    let upstream = Arc::new(RecordingUpstream::default());
    let app = create_router(state_with(upstream.clone(), memory_orchestrator()));

    send(&app, "GET", "/api/odds?date=2025-01-15").await;
    send(&app, "GET", "/api/stats/season-averages?player_ids=1&season=2024").await;

    let (status, body) = send(&app, "DELETE", "/api/cache?prefix=odds:").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 1);

    let (_, odds) = send(&app, "GET", "/api/odds?date=2025-01-15").await;
    assert_eq!(odds["source"], "upstream");
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_prefetch_warms_per_player_entries() {
    let upstream = Arc::new(RecordingUpstream::default());
    let app = create_router(state_with(upstream.clone(), memory_orchestrator()));

    let (status, body) = send(
        &app,
        "POST",
        "/api/prefetch/season-averages?player_ids=1,2,3,4,5,6,7&season=2024",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["total"], 7);
    assert_eq!(body["summary"]["succeeded"], 7);
    assert_eq!(body["failures"], json!([]));
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 7);

    let (_, single) = send(&app, "GET", "/api/stats/season-averages?player_ids=4&season=2024").await;
    assert_eq!(single["source"], "memory");
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 7);
}

// == Persisted Tier Tests ==

#[tokio::test]
async fn test_persisted_tier_survives_cold_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let upstream = Arc::new(RecordingUpstream::default());

    let warm = memory_orchestrator().with_persisted(Arc::new(FileCache::open(&path).await.unwrap()));
    let app = create_router(state_with(upstream.clone(), warm));
    let (_, first) = send(&app, "GET", "/api/odds?date=2025-02-01").await;
    assert_eq!(first["source"], "upstream");

    // Fresh memory tier, same file: simulates a redeploy.
    let cold = memory_orchestrator().with_persisted(Arc::new(FileCache::open(&path).await.unwrap()));
    let app = create_router(state_with(upstream.clone(), cold));
    let (_, second) = send(&app, "GET", "/api/odds?date=2025-02-01").await;
    assert_eq!(second["source"], "persisted");

    let (_, third) = send(&app, "GET", "/api/odds?date=2025-02-01").await;
    assert_eq!(third["source"], "memory");
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);

    let (status, purge) = send(&app, "POST", "/api/cache/persisted/purge").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(purge["removed"], 0);
}

#[tokio::test]
async fn test_purge_without_persisted_tier_is_503() {
    let app = create_router(state_with(
        Arc::new(RecordingUpstream::default()),
        memory_orchestrator(),
    ));

    let (status, body) = send(&app, "POST", "/api/cache/persisted/purge").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
}

// == DvP Tests ==

#[tokio::test]
async fn test_dvp_table_for_team() {
    let upstream = Arc::new(BoxScoreUpstream {
        failing_team: None,
        empty_season: None,
    });
    let app = create_router(state_with(upstream, memory_orchestrator()));

    let (status, body) = send(&app, "GET", "/api/dvp?team=bos&season=2025").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["team"], "BOS");
    assert_eq!(body["team_id"], 1610612738);
    assert_eq!(body["season_label"], "2025-26");
    assert_eq!(body["sample_games"], 1);
    assert_eq!(body["per_game"]["C"], 11.0);
    assert_eq!(body["per_game"]["PG"], 0.0);
}

#[tokio::test]
async fn test_dvp_falls_back_to_previous_season() {
    let upstream = Arc::new(BoxScoreUpstream {
        failing_team: None,
        empty_season: Some(2025),
    });
    let app = create_router(state_with(upstream, memory_orchestrator()));

    let (status, body) = send(&app, "GET", "/api/dvp?team=ATL&season=2025").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["season"], 2024);
    assert_eq!(body["sample_games"], 1);
}

#[tokio::test]
async fn test_dvp_unknown_team_is_400() {
    let upstream = Arc::new(BoxScoreUpstream {
        failing_team: None,
        empty_season: None,
    });
    let app = create_router(state_with(upstream, memory_orchestrator()));

    let (status, _) = send(&app, "GET", "/api/dvp?team=XYZ&season=2025").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dvp_rankings_report_missing_teams() {
    let upstream = Arc::new(BoxScoreUpstream {
        failing_team: Some("BOS"),
        empty_season: None,
    });
    let app = create_router(state_with(upstream, memory_orchestrator()));

    let (status, body) = send(&app, "GET", "/api/dvp/rankings?position=C&season=2025").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["missing"], json!(["BOS"]));
    assert_eq!(body["summary"]["total"], 30);
    assert_eq!(body["summary"]["failed"], 1);

    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 29);
    assert_eq!(rows[0]["rank"], 1);
    assert_eq!(rows[0]["team"], *all_teams().last().unwrap());
    let values: Vec<f64> = rows.iter().map(|r| r["value"].as_f64().unwrap()).collect();
    assert!(values.windows(2).all(|w| w[0] >= w[1]));
}

// == HTTP Upstream Stub Server ==

#[derive(Clone, Default)]
struct StubServer {
    calls: Arc<AtomicUsize>,
    limited_first: usize,
    last_auth: Arc<Mutex<Option<String>>>,
    last_query: Arc<Mutex<Option<String>>>,
}

async fn stub_season_averages(
    State(stub): State<StubServer>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let call = stub.calls.fetch_add(1, Ordering::SeqCst);
    *stub.last_auth.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *stub.last_query.lock().unwrap() = query;

    if call < stub.limited_first {
        return (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response();
    }
    Json(json!({ "data": [{ "player_id": 3, "pts": 21.5 }] })).into_response()
}

async fn stub_missing(State(stub): State<StubServer>) -> Response {
    stub.calls.fetch_add(1, Ordering::SeqCst);
    (StatusCode::NOT_FOUND, "no such resource").into_response()
}

async fn spawn_stub(stub: StubServer) -> String {
    let app = Router::new()
        .route("/season_averages", get(stub_season_averages))
        .route("/missing", get(stub_missing))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

#[tokio::test]
async fn test_http_upstream_retries_rate_limits_then_caches() {
    let stub = StubServer {
        limited_first: 2,
        ..StubServer::default()
    };
    let base_url = spawn_stub(stub.clone()).await;
    let upstream = HttpUpstream::new(base_url, Some("secret".into()), Duration::from_secs(5)).unwrap();
    let app = create_router(state_with(Arc::new(upstream), memory_orchestrator()));

    let (status, body) = send(&app, "GET", "/api/stats/season-averages?player_ids=5,3,3&season=2024").await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["source"], "upstream");
    assert_eq!(body["data"]["data"][0]["pts"], 21.5);
    assert_eq!(stub.calls.load(Ordering::SeqCst), 3);

    assert_eq!(stub.last_auth.lock().unwrap().as_deref(), Some("Bearer secret"));
    let query = stub.last_query.lock().unwrap().clone().unwrap_or_default();
    assert!(query.contains("season=2024"), "query: {}", query);
    assert!(query.contains("player_ids"), "query: {}", query);

    let (_, cached) = send(&app, "GET", "/api/stats/season-averages?player_ids=3,5&season=2024").await;
    assert_eq!(cached["source"], "memory");
    assert_eq!(stub.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_http_upstream_exhausted_retries_surface_as_500() {
    let stub = StubServer {
        limited_first: usize::MAX,
        ..StubServer::default()
    };
    let base_url = spawn_stub(stub.clone()).await;
    let upstream = HttpUpstream::new(base_url, None, Duration::from_secs(5)).unwrap();
    let app = create_router(state_with(Arc::new(upstream), memory_orchestrator()));

    let (status, body) = send(&app, "GET", "/api/stats/season-averages?player_ids=1&season=2024").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(stub.calls.load(Ordering::SeqCst), 4);

    let (_, stats) = send(&app, "GET", "/stats").await;
    assert_eq!(stats["total_entries"], 0);
}

#[tokio::test]
async fn test_http_upstream_non_rate_limit_error_is_not_retried() {
    let stub = StubServer::default();
    let base_url = spawn_stub(stub.clone()).await;
    let upstream = HttpUpstream::new(base_url, None, Duration::from_secs(5)).unwrap();
    let orchestrator = memory_orchestrator();

    let result = orchestrator
        .fetch("missing:lookup", courtside::cache::TtlClass::Odds, false, || {
            upstream.get_json("missing", &[])
        })
        .await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("404"), "error: {}", err);
    assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
}
