//! Live broadcast hub.
//!
//! [`LiveHub`] owns the registry of live connections and the topic each
//! one watches. Every connection gets its own bounded outbound queue; the
//! `WebSocket` task drains it.
//!
//! The registry sits behind a [`RwLock`]. [`LiveHub::publish`] takes the
//! read side and only performs non-blocking `try_send`s while holding it,
//! so publishers run in parallel with each other and never wait on a slow
//! client. Subscribe and unsubscribe take the write side. A subscription
//! that completed before a publish started is therefore always seen by
//! it, and one removed before a publish started never is.
//!
//! Delivery is at most once per connected subscriber. A full or closed
//! queue drops the message for that connection only; nothing is replayed.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use seta_types::{ConnectionId, ScoredShot, ServerMessage, Topic};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Outbound queue state for one live connection.
#[derive(Debug)]
struct Connection {
    tx: mpsc::Sender<ServerMessage>,
    topic: Option<Topic>,
}

#[derive(Debug, Default)]
struct Registry {
    connections: HashMap<ConnectionId, Connection>,
    topics: HashMap<Topic, HashSet<ConnectionId>>,
}

impl Registry {
    fn detach(&mut self, id: ConnectionId, topic: &Topic) {
        if let Some(members) = self.topics.get_mut(topic) {
            members.remove(&id);
            if members.is_empty() {
                self.topics.remove(topic);
            }
        }
    }
}

/// Registry of live connections keyed by topic.
#[derive(Debug)]
pub struct LiveHub {
    registry: RwLock<Registry>,
    channel_capacity: usize,
}

impl LiveHub {
    /// Create an empty hub. Each connection's outbound queue holds at most
    /// `channel_capacity` messages (minimum 1).
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Register a new live connection.
    ///
    /// Returns a handle for managing the subscription and the receiving
    /// end of the connection's outbound queue. Dropping the handle removes
    /// the connection from the hub.
    pub fn connect(self: &Arc<Self>) -> (ConnectionHandle, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let id = ConnectionId::new();
        self.write()
            .connections
            .insert(id, Connection { tx, topic: None });
        debug!(connection = %id, "Live connection registered");

        let handle = ConnectionHandle {
            id,
            hub: Arc::downgrade(self),
        };
        (handle, rx)
    }

    /// Point `id` at `topic`, replacing any previous topic.
    ///
    /// Idempotent. Returns `false` if the connection is not registered.
    pub fn subscribe(&self, id: ConnectionId, topic: Topic) -> bool {
        let mut registry = self.write();
        let Some(connection) = registry.connections.get_mut(&id) else {
            return false;
        };
        if connection.topic.as_ref() == Some(&topic) {
            return true;
        }
        let previous = connection.topic.replace(topic.clone());
        if let Some(previous) = previous {
            registry.detach(id, &previous);
        }
        registry.topics.entry(topic.clone()).or_default().insert(id);
        debug!(connection = %id, %topic, "Subscribed");
        true
    }

    /// Drop the topic of `id`, keeping the connection registered. Unknown
    /// or unsubscribed connections are ignored.
    pub fn unsubscribe(&self, id: ConnectionId) {
        let mut registry = self.write();
        let previous = registry
            .connections
            .get_mut(&id)
            .and_then(|connection| connection.topic.take());
        if let Some(previous) = previous {
            registry.detach(id, &previous);
            debug!(connection = %id, topic = %previous, "Unsubscribed");
        }
    }

    /// Remove `id` entirely, closing its outbound queue. Unknown
    /// connections are ignored.
    pub fn disconnect(&self, id: ConnectionId) {
        let mut registry = self.write();
        if let Some(connection) = registry.connections.remove(&id) {
            if let Some(topic) = connection.topic {
                registry.detach(id, &topic);
            }
            debug!(connection = %id, "Live connection removed");
        }
    }

    /// Deliver `shot` to every connection currently subscribed to `topic`.
    ///
    /// Returns the number of connections the message was queued for. Zero
    /// subscribers is not an error, and delivery failures are logged and
    /// never returned.
    pub fn publish(&self, topic: &Topic, shot: &ScoredShot) -> usize {
        let registry = self.read();
        let Some(members) = registry.topics.get(topic) else {
            return 0;
        };

        let mut delivered: usize = 0;
        for id in members {
            let Some(connection) = registry.connections.get(id) else {
                continue;
            };
            let message = ServerMessage::NewShot {
                payload: shot.clone(),
            };
            match connection.tx.try_send(message) {
                Ok(()) => delivered = delivered.saturating_add(1),
                Err(TrySendError::Full(_)) => {
                    warn!(connection = %id, %topic, "Live queue full, dropping shot for this connection");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(connection = %id, %topic, "Live connection closed before delivery");
                }
            }
        }

        debug!(%topic, delivered, "Shot published");
        delivered
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.read().connections.len()
    }

    /// Number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.read().topics.len()
    }

    /// Number of connections subscribed to `topic`.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.read().topics.get(topic).map_or(0, HashSet::len)
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owner of one live connection's registration.
///
/// Removes the connection from the hub when dropped, so a task that ends
/// for any reason (close frame, send failure, cancellation) never leaves
/// a stale registration behind.
#[derive(Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    hub: Weak<LiveHub>,
}

impl ConnectionHandle {
    /// The connection's identifier.
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Watch `topic`, replacing any previous topic.
    pub fn subscribe(&self, topic: Topic) {
        if let Some(hub) = self.hub.upgrade() {
            hub.subscribe(self.id, topic);
        }
    }

    /// Stop watching without disconnecting.
    pub fn unsubscribe(&self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.disconnect(self.id);
        }
    }
}
