//! Integration tests for the shot API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. Each test gets its own temporary data directory.

#![allow(clippy::unwrap_used, clippy::float_cmp, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use seta_observer::router::build_router;
use seta_observer::state::AppState;
use seta_store::ShotStore;
use seta_types::{PartitionKey, RaceId, ServerMessage, ShooterId};
use tempfile::TempDir;
use tower::ServiceExt;

fn make_test_state(dir: &TempDir) -> Arc<AppState> {
    let store = ShotStore::new(dir.path().join("shots"), false);
    Arc::new(AppState::new(store, 16))
}

fn topic(shooter: &str, race: &str) -> PartitionKey {
    PartitionKey::new(
        ShooterId::parse(shooter).unwrap(),
        RaceId::parse(race).unwrap(),
    )
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn post_shot(app: &Router, body: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::post("/shots")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_owned()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// ---------------------------------------------------------------------------
// Ingestion and read-back
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_post_then_get_returns_identical_shot_with_score() {
    let dir = TempDir::new().unwrap();
    let app = build_router(make_test_state(&dir));

    let (status, created) = post_shot(
        &app,
        r#"{"user_id":"alice","race_id":"r1","shot_data":{"x":0.002,"y":0,"time":"00:00:12.3"}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["success"], true);
    assert!(created["timestamp"].is_string());

    let (status, json) = get(&app, "/shots?user_id=alice&race_id=r1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);

    let shot = &json["shots"][0];
    assert_eq!(shot["user_id"], "alice");
    assert_eq!(shot["race_id"], "r1");
    assert_eq!(shot["timestamp"], created["timestamp"]);
    assert_eq!(shot["shot_data"]["x"], 0.002);
    assert_eq!(shot["shot_data"]["y"], 0.0);
    assert_eq!(shot["shot_data"]["time"], "00:00:12.3");
    assert_eq!(shot["score"], 10.2);
    assert_eq!(json["total_score"], 10.2);
}

#[tokio::test]
async fn test_race_lists_shots_in_order_with_total() {
    let dir = TempDir::new().unwrap();
    let app = build_router(make_test_state(&dir));

    for body in [
        r#"{"user_id":"alice","race_id":"r1","shot_data":{"x":0,"y":0}}"#,
        r#"{"user_id":"alice","race_id":"r1","shot_data":{"x":0.01,"y":0.01}}"#,
        r#"{"user_id":"alice","race_id":"r1","shot_data":{"x":0,"y":0.001}}"#,
    ] {
        let (status, _) = post_shot(&app, body).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, json) = get(&app, "/shots?user_id=alice&race_id=r1").await;
    let shots = json["shots"].as_array().unwrap();
    assert_eq!(shots.len(), 3);
    let scores: Vec<f64> = shots.iter().map(|s| s["score"].as_f64().unwrap()).collect();
    assert_eq!(scores, [10.9, 10.0, 10.6]);
    assert_eq!(json["total_score"], 31.5);

    let timestamps: Vec<&str> = shots
        .iter()
        .map(|s| s["timestamp"].as_str().unwrap())
        .collect();
    let mut sorted = timestamps.clone();
    sorted.sort_unstable();
    assert_eq!(timestamps, sorted);
}

#[tokio::test]
async fn test_unknown_fields_are_not_persisted() {
    let dir = TempDir::new().unwrap();
    let app = build_router(make_test_state(&dir));

    let (status, _) = post_shot(
        &app,
        r#"{"user_id":"alice","race_id":"r1","extra":1,"shot_data":{"x":0,"y":0,"junk":true}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, json) = get(&app, "/shots?user_id=alice&race_id=r1").await;
    let shot = &json["shots"][0];
    assert!(shot.get("extra").is_none());
    assert!(shot["shot_data"].get("junk").is_none());
}

// ---------------------------------------------------------------------------
// Enumeration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_enumerate_shooters_and_races() {
    let dir = TempDir::new().unwrap();
    let app = build_router(make_test_state(&dir));

    for (shooter, race) in [("bob", "r9"), ("alice", "r2"), ("alice", "r1")] {
        let body = format!(
            r#"{{"user_id":"{shooter}","race_id":"{race}","shot_data":{{"x":0,"y":0}}}}"#
        );
        post_shot(&app, &body).await;
    }

    let (status, json) = get(&app, "/shots").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["shooters"], serde_json::json!(["alice", "bob"]));

    let (_, json) = get(&app, "/shots?user_id=alice").await;
    assert_eq!(json["races"], serde_json::json!(["r1", "r2"]));

    // A race without a shooter is ignored.
    let (_, json) = get(&app, "/shots?race_id=r1").await;
    assert_eq!(json["shooters"], serde_json::json!(["alice", "bob"]));
}

#[tokio::test]
async fn test_unknown_shooter_and_race_are_empty() {
    let dir = TempDir::new().unwrap();
    let app = build_router(make_test_state(&dir));

    let (status, json) = get(&app, "/shots").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["shooters"], serde_json::json!([]));

    let (status, json) = get(&app, "/shots?user_id=nobody").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["races"], serde_json::json!([]));

    let (status, json) = get(&app, "/shots?user_id=nobody&race_id=none").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["shots"], serde_json::json!([]));
    assert_eq!(json["count"], 0);
    assert_eq!(json["total_score"], 0.0);
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_invalid_submissions_are_rejected_and_not_stored() {
    let dir = TempDir::new().unwrap();
    let app = build_router(make_test_state(&dir));

    for body in [
        "not json",
        r#"{"race_id":"r1","shot_data":{"x":0,"y":0}}"#,
        r#"{"user_id":"alice","shot_data":{"x":0,"y":0}}"#,
        r#"{"user_id":"alice","race_id":"r1"}"#,
        r#"{"user_id":"alice","race_id":"r1","shot_data":{"y":0}}"#,
        r#"{"user_id":"alice","race_id":"r1","shot_data":{"x":"near","y":0}}"#,
        r#"{"user_id":"","race_id":"r1","shot_data":{"x":0,"y":0}}"#,
        r#"{"user_id":"../etc","race_id":"r1","shot_data":{"x":0,"y":0}}"#,
        r#"{"user_id":"alice","race_id":"a/b","shot_data":{"x":0,"y":0}}"#,
    ] {
        let (status, json) = post_shot(&app, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(json["status"], 400);
        assert_eq!(json["retryable"], false);
    }

    let (_, json) = get(&app, "/shots").await;
    assert_eq!(json["shooters"], serde_json::json!([]));
}

#[tokio::test]
async fn test_traversal_in_query_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = build_router(make_test_state(&dir));

    let (status, _) = get(&app, "/shots?user_id=..").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/shots?user_id=alice&race_id=..%2F..").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_storage_failure_is_server_error_and_publishes_nothing() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocked");
    std::fs::write(&blocker, b"").unwrap();
    let state = Arc::new(AppState::new(ShotStore::new(&blocker, false), 16));
    let app = build_router(Arc::clone(&state));

    let (handle, mut rx) = state.hub.connect();
    handle.subscribe(topic("alice", "r1"));

    let (status, json) = post_shot(
        &app,
        r#"{"user_id":"alice","race_id":"r1","shot_data":{"x":0,"y":0}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["retryable"], true);
    assert!(rx.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Live fan-out through the HTTP path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_post_publishes_to_matching_topic_only() {
    let dir = TempDir::new().unwrap();
    let state = make_test_state(&dir);
    let app = build_router(Arc::clone(&state));

    let (watching, mut watching_rx) = state.hub.connect();
    watching.subscribe(topic("alice", "r1"));
    let (other, mut other_rx) = state.hub.connect();
    other.subscribe(topic("alice", "r2"));
    let (_idle, mut idle_rx) = state.hub.connect();

    let (status, created) = post_shot(
        &app,
        r#"{"user_id":"alice","race_id":"r1","shot_data":{"x":0.0001,"y":0.0001}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    match watching_rx.try_recv().unwrap() {
        ServerMessage::NewShot { payload } => {
            assert_eq!(payload.score, 10.9);
            let json = serde_json::to_value(&payload).unwrap();
            assert_eq!(json["timestamp"], created["timestamp"]);
        }
        other => panic!("expected newShot, got {other:?}"),
    }
    assert!(other_rx.try_recv().is_err());
    assert!(idle_rx.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_reports_live_counts() {
    let dir = TempDir::new().unwrap();
    let state = make_test_state(&dir);
    let app = build_router(Arc::clone(&state));

    let (status, json) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["connections"], 0);
    assert_eq!(json["topics"], 0);

    let (handle, _rx) = state.hub.connect();
    handle.subscribe(topic("alice", "r1"));
    let (_, json) = get(&app, "/health").await;
    assert_eq!(json["connections"], 1);
    assert_eq!(json["topics"], 1);

    drop(handle);
    let (_, json) = get(&app, "/health").await;
    assert_eq!(json["connections"], 0);
    assert_eq!(json["topics"], 0);
}

// ---------------------------------------------------------------------------
// Fidelity and cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_coordinates_round_trip_bit_for_bit_over_http() {
    let dir = TempDir::new().unwrap();
    let app = build_router(make_test_state(&dir));

    let sent = [
        "0.013000000000000001",
        "0.013",
        "0.1",
        "-0.0021000000000000003",
        "0.0029999999999999996",
        "1e-7",
    ];
    for text in sent {
        let body = format!(
            r#"{{"user_id":"alice","race_id":"r1","shot_data":{{"x":{text},"y":{text}}}}}"#
        );
        let (status, _) = post_shot(&app, &body).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, json) = get(&app, "/shots?user_id=alice&race_id=r1").await;
    let shots = json["shots"].as_array().unwrap();
    assert_eq!(shots.len(), sent.len());
    for (shot, text) in shots.iter().zip(sent) {
        let expected = text.parse::<f64>().unwrap().to_bits();
        assert_eq!(shot["shot_data"]["x"].as_f64().unwrap().to_bits(), expected, "x = {text}");
        assert_eq!(shot["shot_data"]["y"].as_f64().unwrap().to_bits(), expected, "y = {text}");
    }
}

#[tokio::test]
async fn test_abandoned_posts_still_publish_every_stored_shot() {
    let dir = TempDir::new().unwrap();
    let store = ShotStore::new(dir.path().join("shots"), true);
    let state = Arc::new(AppState::new(store, 1024));
    let app = build_router(Arc::clone(&state));
    let race = topic("alice", "r1");

    let (handle, mut rx) = state.hub.connect();
    handle.subscribe(race.clone());

    // Drop requests at varying points of the pipeline.
    for k in 0..200_u64 {
        let request = Request::post("/shots")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"user_id":"alice","race_id":"r1","shot_data":{"x":0,"y":0}}"#,
            ))
            .unwrap();
        let _ = tokio::time::timeout(Duration::from_micros(5 * k), app.clone().oneshot(request))
            .await;
    }

    // Detached ingests finish on their own; wait for store and feed to agree.
    let mut published = 0_usize;
    let mut stored = usize::MAX;
    for _ in 0..200 {
        stored = state.store.list_shots(&race).await.unwrap().len();
        while rx.try_recv().is_ok() {
            published += 1;
        }
        if stored == published {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(stored, published);
}
