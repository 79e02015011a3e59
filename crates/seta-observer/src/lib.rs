//! HTTP and `WebSocket` API for the SETA shot telemetry service.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **Ingestion** (`POST /shots`) through the [`IngestGateway`], which
//!   stores a shot durably and only then publishes it
//! - **Read endpoints** (`GET /shots`) enumerating shooters, races, and
//!   the scored shots of a race
//! - **Live feed** (`/ws/shots`) where each connection subscribes to one
//!   shooter/race topic and receives `newShot` messages
//! - **Health** (`GET /health`) with live connection and topic counts
//!
//! # Architecture
//!
//! Storage lives in `seta-store` and scoring in `seta-core`; this crate
//! wires them together. The [`LiveHub`] keeps a topic-indexed registry
//! of connections, each with its own bounded outbound queue, so a slow
//! viewer can only lose its own messages and never stalls ingestion.

pub mod error;
pub mod handlers;
pub mod hub;
pub mod ingest;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ObserverError;
pub use hub::{ConnectionHandle, LiveHub};
pub use ingest::{IngestError, IngestGateway};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
