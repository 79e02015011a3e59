//! `WebSocket` handler for the live shot feed.
//!
//! Clients connect to `GET /ws/shots`, receive a `connected` message, and
//! then send `subscribeToRace` to start receiving `newShot` messages for
//! one shooter/race. Sending `subscribeToRace` again switches topics;
//! `unsubscribe` stops delivery without closing the socket.
//!
//! The connection's hub registration lives in a [`ConnectionHandle`] owned
//! by this task, so it is removed as soon as the task ends.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use seta_types::{ClientMessage, PartitionKey, ServerMessage};
use tracing::{debug, warn};

use crate::hub::ConnectionHandle;
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming shots.
///
/// # Route
///
/// `GET /ws/shots`
pub async fn ws_shots(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: register with the hub, forward queued
/// messages, and apply client subscription requests.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let (handle, mut rx) = state.hub.connect();
    debug!(connection = %handle.id(), "WebSocket client connected");

    let hello = ServerMessage::Connected {
        connection_id: handle.id(),
    };
    if !send(&mut socket, &hello).await {
        return;
    }

    loop {
        tokio::select! {
            // A message queued for this connection by the hub.
            queued = rx.recv() => {
                let Some(message) = queued else {
                    debug!(connection = %handle.id(), "Live queue closed, shutting down WebSocket");
                    return;
                };
                if !send(&mut socket, &message).await {
                    debug!(connection = %handle.id(), "WebSocket client disconnected (send failed)");
                    return;
                }
            }
            // A frame from the client.
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let reply = apply_client_message(&handle, text.as_str());
                        if !send(&mut socket, &reply).await {
                            return;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(connection = %handle.id(), "WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(connection = %handle.id(), "WebSocket client disconnected");
                        return;
                    }
                    Some(Err(e)) => {
                        debug!(connection = %handle.id(), "WebSocket error: {e}");
                        return;
                    }
                    _ => {
                        // Binary and pong frames carry nothing for us.
                    }
                }
            }
        }
    }
}

/// Apply one client text frame to the hub and build the reply.
fn apply_client_message(handle: &ConnectionHandle, text: &str) -> ServerMessage {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::SubscribeToRace { shooter, race_id }) => {
            handle.subscribe(PartitionKey::new(shooter.clone(), race_id.clone()));
            ServerMessage::Subscribed { shooter, race_id }
        }
        Ok(ClientMessage::Unsubscribe) => {
            handle.unsubscribe();
            ServerMessage::Unsubscribed
        }
        Err(e) => {
            debug!(connection = %handle.id(), error = %e, "Rejected client message");
            ServerMessage::Error {
                message: format!("invalid message: {e}"),
            }
        }
    }
}

/// Serialize and send one message. Returns `false` if the socket is gone.
async fn send(socket: &mut WebSocket, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            // Dropping the message keeps the connection usable.
            warn!("Failed to serialize live message: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}
