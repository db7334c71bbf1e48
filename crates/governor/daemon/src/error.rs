//! Error types for governor-daemon

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use governor_core::GovernorError;
use serde::Serialize;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or wrong admin credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Governor rejected the call
    #[error(transparent)]
    Governor(#[from] GovernorError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Governor(err) => match err {
                GovernorError::ApprovalNotFound(_) => (StatusCode::NOT_FOUND, "APPROVAL_NOT_FOUND"),
                GovernorError::UnknownFactor { .. } => (StatusCode::NOT_FOUND, "UNKNOWN_FACTOR"),
                GovernorError::RollbackNotFound(_) => (StatusCode::NOT_FOUND, "ROLLBACK_NOT_FOUND"),
                GovernorError::ApprovalAlreadyResolved { .. } => {
                    (StatusCode::CONFLICT, "APPROVAL_RESOLVED")
                }
                GovernorError::ApprovalExpired(_) => (StatusCode::GONE, "APPROVAL_EXPIRED"),
                GovernorError::EmergencyStopEngaged(_) => (StatusCode::LOCKED, "EMERGENCY_STOP"),
                GovernorError::ShutDown => (StatusCode::SERVICE_UNAVAILABLE, "SHUT_DOWN"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        match &self {
            ApiError::Governor(err) if err.is_not_found() => {
                tracing::debug!(error = %err, code, "Governor lookup missed");
            }
            ApiError::Governor(err) => {
                tracing::warn!(error = %err, code, "Governor refused request");
            }
            _ => {}
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_governor_error_status_codes() {
        let cases = [
            (GovernorError::ApprovalNotFound("apr".into()), StatusCode::NOT_FOUND),
            (GovernorError::RollbackNotFound("op".into()), StatusCode::NOT_FOUND),
            (
                GovernorError::ApprovalAlreadyResolved {
                    approval_id: "apr".into(),
                    status: "REJECTED".into(),
                },
                StatusCode::CONFLICT,
            ),
            (GovernorError::ApprovalExpired("apr".into()), StatusCode::GONE),
            (
                GovernorError::EmergencyStopEngaged("cascade".into()),
                StatusCode::LOCKED,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_unauthorized_status() {
        assert_eq!(
            ApiError::Unauthorized("missing token".into())
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
