// Error handling module for the Event Hub API
// Provides the service-level result envelope and its HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

/// Result envelope returned by every repository and service operation
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure classification carried by every `ServiceError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Storage unavailable or constraint violation
    DatabaseError,
    RecordNotFound,
    AlreadyExists,
    /// Bad credentials, malformed request, capacity exceeded
    InvalidInput,
    /// Revoked or expired refresh token reuse
    Forbidden,
    /// Blob store failures
    FileSystemError,
    UnknownError,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::AlreadyExists => StatusCode::CONFLICT,
            ErrorKind::RecordNotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::DatabaseError | ErrorKind::FileSystemError | ErrorKind::UnknownError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(self) -> &'static str {
        match self {
            ErrorKind::DatabaseError => "DATABASE_ERROR",
            ErrorKind::RecordNotFound => "NOT_FOUND",
            ErrorKind::AlreadyExists => "CONFLICT",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::FileSystemError => "FILE_SYSTEM_ERROR",
            ErrorKind::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A failed operation: exactly one taxonomy tag plus a client-safe message
///
/// Internal detail (SQL text, io errors) is logged where the error is created
/// and never stored in the message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    kind: ErrorKind,
    message: String,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Named not-found, e.g. "Event with id 42 not found"
    pub fn not_found(entity: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::RecordNotFound,
            format!("{} with id {} not found", entity, id),
        )
    }

    pub fn already_exists(entity: &str, key: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::AlreadyExists,
            format!("{} '{}' already exists", entity, key),
        )
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DatabaseError, message)
    }

    pub fn file_system(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileSystemError, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownError, message)
    }

    /// Replace the message while keeping the tag
    pub fn with_message(self, message: impl Into<String>) -> Self {
        Self::new(self.kind, message)
    }
}

/// JSON body of every error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
    /// ISO 8601 timestamp of when the error occurred
    pub timestamp: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();

        match self.kind {
            ErrorKind::DatabaseError | ErrorKind::FileSystemError | ErrorKind::UnknownError => {
                error!("Request failed: {}", self);
            }
            ErrorKind::AlreadyExists | ErrorKind::Forbidden => warn!("Request rejected: {}", self),
            ErrorKind::RecordNotFound | ErrorKind::InvalidInput => {
                debug!("Request rejected: {}", self)
            }
        }

        let body = ErrorResponse {
            error_code: self.kind.code().to_string(),
            message: self.message,
            timestamp: Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

/// Storage failures are logged in full and surfaced as a generic DatabaseError
impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => {
                ServiceError::new(ErrorKind::RecordNotFound, "Record not found")
            }
            other => {
                error!("Database error: {:?}", other);
                ServiceError::database("A database error occurred")
            }
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        debug!("Validation error: {:?}", errors);
        ServiceError::invalid_input(format!("Request validation failed: {}", errors))
    }
}

/// A blocking task that panicked or was cancelled
impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!("Background task failed: {}", err);
        ServiceError::unknown("An internal error occurred")
    }
}

/// Returns true when a sqlx error is a unique constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Returns true when a sqlx error is a foreign key violation
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}
