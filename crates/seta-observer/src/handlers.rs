//! REST API endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/shots` | List shooters with stored shots |
//! | `GET` | `/shots?user_id=S` | List races of shooter `S` |
//! | `GET` | `/shots?user_id=S&race_id=R` | List scored shots of one race |
//! | `POST` | `/shots` | Ingest a shot |
//! | `GET` | `/health` | Liveness and live feed counters |
//!
//! Unknown shooters and races yield empty collections, never errors.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use seta_core::{score_shot, total_score};
use seta_types::{PartitionKey, RaceId, ScoredShot, ShooterId};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /shots`.
///
/// Empty values count as absent. `race_id` is ignored without `user_id`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ShotsQuery {
    /// Restrict to one shooter.
    pub user_id: Option<String>,
    /// Restrict to one race of that shooter.
    pub race_id: Option<String>,
}

// ---------------------------------------------------------------------------
// GET /shots -- enumeration and race detail
// ---------------------------------------------------------------------------

/// Enumerate shooters, races of a shooter, or shots of a race, depending
/// on which query parameters are present.
pub async fn get_shots(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ShotsQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let Some(user_id) = params.user_id.filter(|s| !s.is_empty()) else {
        let shooters = state.store.list_shooters().await?;
        return Ok(Json(serde_json::json!({ "shooters": shooters })));
    };
    let shooter = ShooterId::parse(user_id)?;

    let Some(race_id) = params.race_id.filter(|s| !s.is_empty()) else {
        let races = state.store.list_races(&shooter).await?;
        return Ok(Json(serde_json::json!({ "races": races })));
    };
    let key = PartitionKey::new(shooter, RaceId::parse(race_id)?);

    let shots: Vec<ScoredShot> = state
        .store
        .list_shots(&key)
        .await?
        .into_iter()
        .map(score_shot)
        .collect();

    Ok(Json(serde_json::json!({
        "shots": shots,
        "count": shots.len(),
        "total_score": total_score(&shots),
    })))
}

// ---------------------------------------------------------------------------
// POST /shots -- ingestion
// ---------------------------------------------------------------------------

/// Ingest one shot. Responds `201` with the assigned timestamp once the
/// shot is durable; the live publish has already been queued by then.
///
/// The pipeline runs on its own task, so a client that disconnects
/// mid-request cannot leave a stored shot unpublished or a write half done.
pub async fn post_shot(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ObserverError> {
    let gateway = state.gateway.clone();
    let stored = tokio::spawn(async move { gateway.ingest(&body).await })
        .await
        .map_err(|e| ObserverError::Internal(format!("ingest task failed: {e}")))??;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "timestamp": stored.timestamp,
        })),
    ))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report liveness and the hub's connection and topic counts.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "connections": state.hub.connection_count(),
        "topics": state.hub.topic_count(),
    }))
}
