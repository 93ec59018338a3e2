//! Error types for web handlers.
//!
//! Bridges the engine's error taxonomy to HTTP responses via Axum's
//! `IntoResponse`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use stayforge_core::EngineError;

/// Application error type for web handlers.
///
/// Wraps domain errors and internal failures into HTTP-friendly error
/// responses with a stable machine-readable code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: &'static str,
    retryable: bool,
    #[allow(dead_code)] // kept for logging, never exposed to the client
    source: Option<anyhow::Error>,
}

/// JSON body of an error response
#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'a str,
    retryable: bool,
}

impl ApiError {
    /// Creates an error with the given status, message, and code
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: &'static str) -> Self {
        Self {
            status,
            message,
            code,
            retryable: false,
            source: None,
        }
    }

    /// Creates a 400 Bad Request error
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "BAD_REQUEST")
    }

    /// Creates a 404 Not Found error
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message.into(), "NOT_FOUND")
    }

    /// Creates a 500 Internal Server Error carrying the source for logs
    #[must_use]
    pub fn internal(source: anyhow::Error) -> Self {
        let mut err = Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
            "INTERNAL",
        );
        err.source = Some(source);
        err
    }
}

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        let message = error.to_string();
        let retryable = error.is_retryable();
        let (status, code) = match &error {
            EngineError::InvalidInterval { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_INTERVAL")
            }
            EngineError::BelowMinimumDuration { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "BELOW_MINIMUM_DURATION")
            }
            EngineError::CapacityExceeded { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "CAPACITY_EXCEEDED")
            }
            EngineError::InvalidExtension { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_EXTENSION")
            }
            EngineError::UnitNotFound(_) => (StatusCode::NOT_FOUND, "UNIT_NOT_FOUND"),
            EngineError::BookingNotFound(_) => (StatusCode::NOT_FOUND, "BOOKING_NOT_FOUND"),
            EngineError::SlotUnavailable { .. } => (StatusCode::CONFLICT, "SLOT_UNAVAILABLE"),
            EngineError::SlotNoLongerAvailable { .. } => {
                (StatusCode::CONFLICT, "SLOT_NO_LONGER_AVAILABLE")
            }
            EngineError::InvalidStateTransition { .. } => {
                (StatusCode::CONFLICT, "INVALID_STATE_TRANSITION")
            }
            EngineError::LockTimeout { .. } => (StatusCode::REQUEST_TIMEOUT, "LOCK_TIMEOUT"),
            EngineError::LedgerWriteRejected { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "LEDGER_WRITE_REJECTED")
            }
            EngineError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE"),
        };

        let mut api = Self::new(status, message, code);
        api.retryable = retryable;
        api
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                code = self.code,
                message = %self.message,
                source = ?self.source,
                "request failed"
            );
        } else {
            tracing::debug!(code = self.code, message = %self.message, "request rejected");
        }

        let body = ErrorBody {
            error: &self.message,
            code: self.code,
            retryable: self.retryable,
        };
        (self.status, Json(&body)).into_response()
    }
}
