//! Ingestion gateway.
//!
//! Ingestion is a two-phase pipeline:
//!
//! 1. [`IngestGateway::append`] validates and durably stores the shot.
//! 2. [`IngestGateway::notify`] scores the stored record and publishes it
//!    to the hub, fire-and-forget.
//!
//! Phase 2 only ever runs on the output of a successful phase 1, so a live
//! viewer never sees a shot the read path cannot return. The outcome of
//! phase 2 has no influence on the result of ingestion.

use std::sync::Arc;

use seta_store::{ShotStore, StoreError};
use seta_types::{PartitionKey, ShotData, ShotSubmission, StoredShot, ValidationError};
use tracing::{info, warn};

use crate::hub::LiveHub;

/// Errors that fail an ingestion.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The submission was missing a field or carried a bad value.
    #[error("invalid submission: {0}")]
    Validation(#[from] ValidationError),

    /// The shot could not be stored. Nothing was published.
    #[error("storage failure: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for IngestError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Validation(e) => Self::Validation(e),
            other => Self::Storage(other),
        }
    }
}

/// Validates submissions, stores them, then publishes them.
#[derive(Debug, Clone)]
pub struct IngestGateway {
    store: Arc<ShotStore>,
    hub: Arc<LiveHub>,
}

impl IngestGateway {
    /// Create a gateway over a store and a hub.
    pub const fn new(store: Arc<ShotStore>, hub: Arc<LiveHub>) -> Self {
        Self { store, hub }
    }

    /// Ingest a raw JSON `POST /shots` body.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Validation`] for malformed or incomplete
    /// bodies and [`IngestError::Storage`] if the store rejected the write.
    pub async fn ingest(&self, body: &[u8]) -> Result<StoredShot, IngestError> {
        let submission = ShotSubmission::from_slice(body)?;
        self.ingest_submission(submission).await
    }

    /// Ingest an already decoded submission.
    ///
    /// # Errors
    ///
    /// See [`IngestGateway::ingest`].
    pub async fn ingest_submission(
        &self,
        submission: ShotSubmission,
    ) -> Result<StoredShot, IngestError> {
        let (key, shot_data) = submission.validate()?;
        let stored = self.append(&key, shot_data).await?;
        self.notify(&stored);
        Ok(stored)
    }

    /// Phase 1: durably store the shot.
    ///
    /// # Errors
    ///
    /// Returns the store's error, mapped into [`IngestError`].
    pub async fn append(
        &self,
        key: &PartitionKey,
        shot_data: ShotData,
    ) -> Result<StoredShot, IngestError> {
        match self.store.append(key, shot_data).await {
            Ok(stored) => {
                info!(partition = %key, timestamp = %stored.timestamp, "Shot ingested");
                Ok(stored)
            }
            Err(e) => {
                warn!(partition = %key, error = %e, retryable = e.is_retryable(), "Shot not ingested");
                Err(e.into())
            }
        }
    }

    /// Phase 2: publish a stored shot to its topic. Never fails; returns
    /// the number of live connections it was queued for.
    pub fn notify(&self, stored: &StoredShot) -> usize {
        let scored = seta_core::score_shot(stored.clone());
        self.hub.publish(&stored.partition(), &scored)
    }
}
