use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Clients match on these —
// never on the human-readable message string.

/// Stable error code constants.
///
/// Clients should match on `code` from `{"code": "NOT_FOUND", "message": "..."}`.
/// Codes never change; messages may be reworded.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CONFLICT: &str = "CONFLICT";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const INVALID_TRANSITION: &str = "INVALID_TRANSITION";
    pub const INVALID_STATE: &str = "INVALID_STATE";
    pub const CASE_CLOSED: &str = "CASE_CLOSED";
    pub const INTERNAL: &str = "INTERNAL";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
}

// ── ServiceError ────────────────────────────────────────────────────

/// Unified service error type used across all modules.
///
/// Each variant maps to a stable error code (see [`error_code`]) and an
/// HTTP status code. The JSON response always includes both:
///
/// ```json
/// {"code": "NOT_FOUND", "message": "case 'abc' not found"}
/// ```
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Resource does not exist, or is not owned by the requesting tenant.
    /// The two are indistinguishable on purpose. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Write contention the caller may retry (e.g. sequence allocation
    /// surfaced as a busy datastore). HTTP 409.
    #[error("{0}")]
    Conflict(String),

    /// Input data is invalid. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// The requested stage transition is illegal for the stage's current
    /// state. Message names both current and requested state. HTTP 409.
    #[error("{0}")]
    InvalidTransition(String),

    /// The requested case operation is illegal for the case's current
    /// status (e.g. delivering twice). HTTP 409.
    #[error("{0}")]
    InvalidState(String),

    /// Any operation attempted on a DELIVERED or CANCELLED case. HTTP 409.
    #[error("{0}")]
    CaseClosed(String),

    /// Storage backend failure. HTTP 500.
    #[error("{0}")]
    Storage(String),

    /// Unexpected internal error. HTTP 500.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => error_code::NOT_FOUND,
            ServiceError::Conflict(_) => error_code::CONFLICT,
            ServiceError::Validation(_) => error_code::VALIDATION_FAILED,
            ServiceError::InvalidTransition(_) => error_code::INVALID_TRANSITION,
            ServiceError::InvalidState(_) => error_code::INVALID_STATE,
            ServiceError::CaseClosed(_) => error_code::CASE_CLOSED,
            ServiceError::Storage(_) => error_code::STORAGE_ERROR,
            ServiceError::Internal(_) => error_code::INTERNAL,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::InvalidTransition(_) => StatusCode::CONFLICT,
            ServiceError::InvalidState(_) => StatusCode::CONFLICT,
            ServiceError::CaseClosed(_) => StatusCode::CONFLICT,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether a caller may retry the failed operation as-is.
    ///
    /// Only `Conflict` (sequence-allocation contention) qualifies; every
    /// other class is a definitive rejection.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Conflict(_))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
