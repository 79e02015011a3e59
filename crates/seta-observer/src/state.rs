//! Shared application state for the SETA API server.
//!
//! [`AppState`] owns the shot store, the live hub, and the ingestion
//! gateway wired over both. It is created once at startup, shared by every
//! handler through Axum's `State` extractor, and dropped at shutdown,
//! which closes every live connection's outbound queue.

use std::sync::Arc;

use seta_store::ShotStore;

use crate::hub::LiveHub;
use crate::ingest::IngestGateway;

/// Shared state for the Axum application.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Durable shot storage (read path).
    pub store: Arc<ShotStore>,
    /// Live subscription registry.
    pub hub: Arc<LiveHub>,
    /// Write path: store, then publish.
    pub gateway: IngestGateway,
}

impl AppState {
    /// Wire a store and a fresh hub together.
    ///
    /// `channel_capacity` bounds each live connection's outbound queue.
    pub fn new(store: ShotStore, channel_capacity: usize) -> Self {
        let store = Arc::new(store);
        let hub = Arc::new(LiveHub::new(channel_capacity));
        let gateway = IngestGateway::new(Arc::clone(&store), Arc::clone(&hub));
        Self {
            store,
            hub,
            gateway,
        }
    }
}
