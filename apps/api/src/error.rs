//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Galley POS                             │
//! │                                                                         │
//! │  Handler                                                                │
//! │  Result<Json<T>, ApiError>                                              │
//! │         │                                                               │
//! │         ├── JsonRejection (bad body, unknown status) ──► 400            │
//! │         ├── ValidationError ─────────────────────────────► 400          │
//! │         ├── CoreError                                                   │
//! │         │     OrderNotFound / OrderLineNotFound ─────────► 404          │
//! │         │     InvalidTransition / OrderLocked ───────────► 409          │
//! │         │     InsufficientStock ─────────────────────────► 409          │
//! │         │     QuantityOverflow ──────────────────────────► 500          │
//! │         ├── DbError                                                     │
//! │         │     NotFound ──────────────────────────────────► 404          │
//! │         │     Conflict / UniqueViolation ────────────────► 409          │
//! │         │     Timeout (deduction) ───────────────────────► 500          │
//! │         │     Busy (write lock not granted) ─────────────► 503          │
//! │         │     everything else ───────────────────────────► 500          │
//! │         └── RelayError (order numbering only) ───────────► 503          │
//! │                                                                         │
//! │  Body: { "code": "INVALID_TRANSITION", "message": "..." }               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Broadcast and cache failures after commit never become an `ApiError`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::order_update::OrderUpdateError;
use galley_core::{CoreError, ValidationError};
use galley_db::DbError;
use galley_relay::RelayError;

/// Error body returned by every failing handler.
///
/// ```json
/// {
///   "code": "INVALID_TRANSITION",
///   "message": "Order 7f3c... cannot move from paid to pending"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Order, line or other resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Backward status move or leaving PAID (409)
    InvalidTransition,

    /// Line edits on a paid order (409)
    OrderLocked,

    /// Concurrent update or duplicate resource (409)
    Conflict,

    /// Strict stock policy rejected the deduction (409)
    InsufficientStock,

    /// Deduction did not complete (500)
    DeductionError,

    /// Database operation failed (500)
    PersistenceError,

    /// A required collaborator is unreachable or the database is busy (503)
    Unavailable,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::InvalidTransition
            | ErrorCode::OrderLocked
            | ErrorCode::Conflict
            | ErrorCode::InsufficientStock => StatusCode::CONFLICT,
            ErrorCode::DeductionError | ErrorCode::PersistenceError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::Rule(core) => core.into(),
            DbError::Conflict(message) => ApiError::new(ErrorCode::Conflict, message),
            DbError::Busy(message) => {
                tracing::warn!("Write lock not granted: {}", message);
                ApiError::new(ErrorCode::Unavailable, "Database busy, retry the request")
            }
            DbError::Timeout(message) => {
                tracing::error!("Deduction timed out: {}", message);
                ApiError::new(ErrorCode::DeductionError, message)
            }
            DbError::ConnectionFailed(_) | DbError::PoolExhausted => {
                ApiError::new(ErrorCode::PersistenceError, "Database unavailable")
            }
            DbError::MigrationFailed(e) | DbError::QueryFailed(e) | DbError::Internal(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", e);
                ApiError::new(ErrorCode::PersistenceError, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::OrderNotFound(_) | CoreError::OrderLineNotFound { .. } => ErrorCode::NotFound,
            CoreError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            CoreError::OrderLocked(_) => ErrorCode::OrderLocked,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::QuantityOverflow { .. } => {
                tracing::error!("Deduction failed: {}", err);
                ErrorCode::DeductionError
            }
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        let message = match err {
            CoreError::Validation(e) => e.to_string(),
            other => other.to_string(),
        };
        ApiError::new(code, message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<OrderUpdateError> for ApiError {
    fn from(err: OrderUpdateError) -> Self {
        match err {
            OrderUpdateError::Invalid(e) => e.into(),
            OrderUpdateError::Persistence(e) => e.into(),
            OrderUpdateError::Numbering(e) => e.into(),
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        tracing::error!("Required collaborator failed: {}", err);
        ApiError::new(ErrorCode::Unavailable, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
