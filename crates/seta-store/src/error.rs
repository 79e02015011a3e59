//! Error types for the shot store.

use std::path::PathBuf;

use seta_types::ValidationError;

/// Errors that can occur while appending or listing shots.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The shot itself was rejected before any I/O.
    #[error("invalid shot: {0}")]
    Validation(#[from] ValidationError),

    /// The storage medium could not complete an operation. The shot, if
    /// any, was not stored and the caller may retry.
    #[error("storage unavailable during {operation} at {}: {source}", .path.display())]
    StorageUnavailable {
        /// What the store was doing.
        operation: &'static str,
        /// The path involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A shot record could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No free timestamp could be allocated in the partition.
    #[error("could not allocate a unique timestamp in partition {partition}")]
    Conflict {
        /// The partition (`shooter/race`).
        partition: String,
    },
}

impl StoreError {
    /// Whether retrying the same request may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. } | Self::Conflict { .. })
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageUnavailable {
            operation,
            path: path.into(),
            source,
        }
    }
}
