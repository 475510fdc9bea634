//! Error types for the ILL eligibility service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Numeric error codes returned in API error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    MissingDriver = 2,
    BadConfiguration = 3,
    SearchFailure = 4,
    SearchTimeout = 5,
    BadValue = 6,
    IncompleteQuery = 7,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// A status-dependent operation was called before a record was attached
    #[error("No record attached to the eligibility engine")]
    MissingDriver,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Search timed out after {0} ms")]
    SearchTimeout(u64),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Configuration(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Search(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::MissingDriver => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::MissingDriver,
                self.to_string(),
            ),
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::BadConfiguration,
                    "Invalid server configuration".to_string(),
                )
            }
            AppError::Search(msg) => {
                (StatusCode::BAD_GATEWAY, ErrorCode::SearchFailure, msg.clone())
            }
            AppError::SearchTimeout(_) => {
                (StatusCode::GATEWAY_TIMEOUT, ErrorCode::SearchTimeout, self.to_string())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::IncompleteQuery, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let response = AppError::SearchTimeout(3000).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let response = AppError::BadRequest("incomplete".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::Search("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_error_codes_are_nonzero() {
        for code in [
            ErrorCode::Failure,
            ErrorCode::MissingDriver,
            ErrorCode::BadConfiguration,
            ErrorCode::SearchFailure,
            ErrorCode::SearchTimeout,
            ErrorCode::BadValue,
            ErrorCode::IncompleteQuery,
        ] {
            assert_ne!(code as u32, 0, "{:?}", code);
        }
    }
}
