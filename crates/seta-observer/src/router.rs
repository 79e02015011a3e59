//! Axum router construction for the shot API.
//!
//! Assembles the REST and `WebSocket` routes into a single [`Router`]
//! with CORS enabled for cross-origin display clients.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /shots` -- enumerate shooters, races, or the shots of a race
/// - `POST /shots` -- ingest a shot
/// - `GET /health` -- liveness and live feed counters
/// - `GET /ws/shots` -- `WebSocket` live shot feed
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/shots",
            get(handlers::get_shots).post(handlers::post_shot),
        )
        .route("/health", get(handlers::health))
        .route("/ws/shots", get(ws::ws_shots))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
