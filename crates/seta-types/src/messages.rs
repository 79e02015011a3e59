//! Live feed wire messages.
//!
//! Both directions are JSON objects tagged by a `type` field:
//!
//! | Direction | `type` | Fields |
//! |-----------|--------|--------|
//! | client -> server | `subscribeToRace` | `shooter`, `raceId` |
//! | client -> server | `unsubscribe` | |
//! | server -> client | `connected` | `connectionId` |
//! | server -> client | `subscribed` | `shooter`, `raceId` |
//! | server -> client | `unsubscribed` | |
//! | server -> client | `newShot` | `payload` |
//! | server -> client | `error` | `message` |

use serde::{Deserialize, Serialize};

use crate::ids::{ConnectionId, RaceId, ShooterId};
use crate::shot::ScoredShot;

/// A message sent by a live feed client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Watch one shooter/race. Replaces any previous subscription.
    SubscribeToRace {
        /// The shooter to watch.
        shooter: ShooterId,
        /// The race to watch.
        #[serde(rename = "raceId")]
        race_id: RaceId,
    },
    /// Stop watching without closing the connection.
    Unsubscribe,
}

/// A message pushed by the server to a live feed client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Sent once when the connection is established.
    Connected {
        /// The server-assigned connection identifier.
        #[serde(rename = "connectionId")]
        connection_id: ConnectionId,
    },
    /// Acknowledges a [`ClientMessage::SubscribeToRace`].
    Subscribed {
        /// The shooter now watched.
        shooter: ShooterId,
        /// The race now watched.
        #[serde(rename = "raceId")]
        race_id: RaceId,
    },
    /// Acknowledges a [`ClientMessage::Unsubscribe`].
    Unsubscribed,
    /// A shot was durably stored on the watched topic.
    NewShot {
        /// The stored shot with its derived score.
        payload: ScoredShot,
    },
    /// The last client message could not be handled.
    Error {
        /// Human-readable reason.
        message: String,
    },
}
