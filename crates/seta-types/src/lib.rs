//! Shared type definitions for the SETA shot telemetry service.
//!
//! Every crate in the workspace speaks in these types: the store persists
//! them, the observer serves them over HTTP and pushes them over the live
//! feed.
//!
//! # Modules
//!
//! - [`ids`] -- Validated shooter/race identifiers and connection IDs
//! - [`shot`] -- Shot records as submitted, stored, and scored
//! - [`messages`] -- Live feed wire messages
//! - [`error`] -- Validation failures for untrusted input

pub mod error;
pub mod ids;
pub mod messages;
pub mod shot;

pub use error::ValidationError;
pub use ids::{ConnectionId, PartitionKey, RaceId, ShooterId, Topic};
pub use messages::{ClientMessage, ServerMessage};
pub use shot::{ScoredShot, ShotData, ShotSubmission, StoredShot};
