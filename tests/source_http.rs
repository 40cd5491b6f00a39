// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! HTTP clients against a local axum stub of the upstream APIs.
//!
//! Run with: `cargo test --test source_http`

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use pitwall_sync::resilience::ResiliencePolicy;
use pitwall_sync::source::{ErgastClient, OpenF1Client, ResilientRacingSource};
use pitwall_sync::{
    normalize, CircuitBreaker, CircuitConfig, CircuitState, ErrorKind, RacingSource, RetryConfig,
    SeasonId, TelemetrySource,
};

#[derive(Clone, Default)]
struct Hits {
    unavailable: Arc<AtomicUsize>,
    laps: Arc<AtomicUsize>,
}

async fn schedule() -> impl IntoResponse {
    Json(json!({"MRData": {"total": "1", "RaceTable": {"season": "2024", "Races": [{
        "season": "2024", "round": "1", "raceName": "Bahrain Grand Prix", "date": "2024-03-02",
        "Circuit": {"circuitId": "bahrain", "circuitName": "Bahrain International Circuit",
                    "Location": {"locality": "Sakhir", "country": "Bahrain", "lat": "26.03", "long": "50.51"}}
    }]}}}))
}

async fn unavailable(State(hits): State<Hits>) -> impl IntoResponse {
    hits.unavailable.fetch_add(1, Ordering::SeqCst);
    (StatusCode::SERVICE_UNAVAILABLE, "upstream overloaded")
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "no such season")
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({}))
}

async fn malformed() -> impl IntoResponse {
    (StatusCode::OK, "<html>maintenance</html>")
}

/// Three lap timings served two per page.
async fn laps(
    State(hits): State<Hits>,
    Query(q): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    hits.laps.fetch_add(1, Ordering::SeqCst);
    let offset: u64 = q.get("offset").and_then(|o| o.parse().ok()).unwrap_or(0);
    let rows = [
        ("1", "verstappen", "1:37.284"),
        ("1", "perez", "1:38.019"),
        ("2", "verstappen", "1:36.900"),
    ];
    let timings: Vec<_> = rows
        .iter()
        .skip(offset as usize)
        .take(2)
        .map(|(lap, driver, time)| {
            json!({"number": lap, "Timings": [{"driverId": driver, "position": "1", "time": time}]})
        })
        .collect();
    Json(json!({"MRData": {"limit": "2", "offset": offset.to_string(), "total": "3", "RaceTable": {"Races": [{
        "season": "2024", "round": "5", "raceName": "Chinese Grand Prix", "date": "2024-04-21",
        "Circuit": {"circuitId": "shanghai", "circuitName": "Shanghai International Circuit"},
        "Laps": timings
    }]}}}))
}

async fn sessions(Query(q): Query<HashMap<String, String>>) -> impl IntoResponse {
    let year: i32 = q.get("year").and_then(|y| y.parse().ok()).unwrap_or(0);
    Json(json!([{"session_key": 9472, "session_name": "Race", "year": year, "country_name": "Bahrain"}]))
}

async fn spawn_stub() -> (String, Hits) {
    let hits = Hits::default();
    let app = Router::new()
        .route("/2024.json", get(schedule))
        .route("/2025.json", get(unavailable))
        .route("/1900.json", get(not_found))
        .route("/2022.json", get(slow))
        .route("/2021.json", get(malformed))
        .route("/2024/5/laps.json", get(laps))
        .route("/sessions", get(sessions))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}", addr), hits)
}

fn season(raw: &str) -> SeasonId {
    SeasonId::parse(raw).unwrap()
}

#[tokio::test]
async fn test_schedule_round_trip() {
    let (base, _) = spawn_stub().await;
    let client = ErgastClient::new(&base, Duration::from_secs(2)).unwrap();

    let raw = client.fetch_races(&season("2024")).await.unwrap();
    let schedule = normalize::schedule(&raw).unwrap();
    assert_eq!(schedule.races.len(), 1);
    assert_eq!(schedule.circuits[0].locality, "Sakhir");
}

#[tokio::test]
async fn test_5xx_is_unavailable_and_404_is_data_error() {
    let (base, _) = spawn_stub().await;
    let client = ErgastClient::new(&base, Duration::from_secs(2)).unwrap();

    let err = client.fetch_races(&season("2025")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    assert!(err.to_string().contains("503"));

    let err = client.fetch_races(&season("1900")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceData);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_timeout_is_unavailable() {
    let (base, _) = spawn_stub().await;
    let client = ErgastClient::new(&base, Duration::from_millis(200)).unwrap();

    let err = client.fetch_races(&season("2022")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    assert!(err.to_string().contains("timed out"), "{}", err);
}

#[tokio::test]
async fn test_malformed_body_is_unavailable() {
    let (base, _) = spawn_stub().await;
    let client = ErgastClient::new(&base, Duration::from_secs(2)).unwrap();

    let err = client.fetch_races(&season("2021")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    assert!(err.to_string().contains("malformed"));
}

#[tokio::test]
async fn test_lap_times_follow_pagination() {
    let (base, hits) = spawn_stub().await;
    let client = ErgastClient::new(&base, Duration::from_secs(2)).unwrap();

    let pages = client.fetch_lap_times(&season("2024"), 5).await.unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(hits.laps.load(Ordering::SeqCst), 2);

    let laps: Vec<_> = pages.iter().flat_map(|p| normalize::lap_times(p).unwrap()).collect();
    assert_eq!(laps.len(), 3);
    assert_eq!(laps[2].lap, 2);
    assert_eq!(laps[2].millis, Some(96_900));
    assert!(laps.iter().all(|l| l.race_id == "2024-05"));
}

#[tokio::test]
async fn test_telemetry_sessions_query() {
    let (base, _) = spawn_stub().await;
    let client = OpenF1Client::new(&base, Duration::from_secs(2)).unwrap();

    let raw = client.fetch_sessions(2024).await.unwrap();
    let sessions = normalize::telemetry_sessions(&raw).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].year, 2024);
    assert_eq!(sessions[0].session_key, 9472);
}

#[tokio::test]
async fn test_resilient_client_retries_then_opens_circuit() {
    let (base, hits) = spawn_stub().await;
    let retry = RetryConfig {
        max_attempts: Some(3),
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        factor: 2.0,
        jitter: Duration::ZERO,
    };
    let breaker = Arc::new(CircuitBreaker::new(
        "racing_api",
        CircuitConfig { failure_threshold: 5, recovery_timeout: Duration::from_secs(60) },
    ));
    let client = ResilientRacingSource::new(
        Arc::new(ErgastClient::new(&base, Duration::from_secs(2)).unwrap()),
        ResiliencePolicy::new(retry, breaker.clone()),
    );

    // 3 attempts, all 503
    let err = client.fetch_races(&season("2025")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    assert_eq!(hits.unavailable.load(Ordering::SeqCst), 3);

    // 2 more failures reach the threshold, the third attempt is rejected
    let err = client.fetch_races(&season("2025")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircuitOpen);
    assert_eq!(hits.unavailable.load(Ordering::SeqCst), 5);
    assert_eq!(breaker.state(), CircuitState::Open);

    // Open circuit: no request reaches the server
    let err = client.fetch_races(&season("2024")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircuitOpen);
    assert_eq!(hits.unavailable.load(Ordering::SeqCst), 5);

    // Permanent errors are never retried
    let fresh = ResilientRacingSource::new(
        Arc::new(ErgastClient::new(&base, Duration::from_secs(2)).unwrap()),
        ResiliencePolicy::new(
            RetryConfig { max_attempts: Some(3), ..RetryConfig::startup() },
            Arc::new(CircuitBreaker::with_defaults("racing_api")),
        ),
    );
    let err = fresh.fetch_races(&season("1900")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceData);
}
