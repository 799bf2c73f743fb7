// Authentication and authorization errors raised at the HTTP boundary

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::fmt;
use tracing::warn;

use crate::auth::models::Role;
use crate::error::ErrorResponse;

/// Failures of bearer-token authentication and role checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    ExpiredToken,
    /// User lacks the role required by the endpoint
    InsufficientPermissions { required: Role },
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::ExpiredToken => write!(f, "Token has expired"),
            AuthError::InsufficientPermissions { required } => {
                write!(f, "Insufficient permissions: required role '{}'", required)
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::ExpiredToken => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::ExpiredToken => "EXPIRED_TOKEN",
            AuthError::InsufficientPermissions { .. } => "INSUFFICIENT_PERMISSIONS",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        warn!("Authentication rejected: {}", self);

        let body = ErrorResponse {
            error_code: self.error_code().to_string(),
            message: self.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        };

        (self.status_code(), Json(body)).into_response()
    }
}
