//! Error types for the SETA API layer.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use seta_store::StoreError;
use seta_types::ValidationError;

use crate::ingest::IngestError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// A request parameter or body was invalid.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The shot store could not serve the request.
    #[error("{0}")]
    Storage(StoreError),

    /// A background task died before producing a result.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ObserverError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Validation(e) => Self::Validation(e),
            other => Self::Storage(other),
        }
    }
}

impl From<IngestError> for ObserverError {
    fn from(error: IngestError) -> Self {
        match error {
            IngestError::Validation(e) => Self::Validation(e),
            IngestError::Storage(e) => Self::Storage(e),
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let (status, message, retryable) = match &self {
            Self::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string(), false),
            Self::Storage(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("storage unavailable"),
                e.is_retryable(),
            ),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("internal error"),
                false,
            ),
        };

        // Server-side details stay in the log, not in the response.
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
            "retryable": retryable,
        });

        (status, axum::Json(body)).into_response()
    }
}
