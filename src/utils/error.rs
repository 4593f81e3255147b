//! Error handling module
//!
//! Defines the gateway's error taxonomy and HTTP response mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// No aggregator credentials are configured
    #[error("No OpenRouter API keys are configured")]
    NoCredentials,

    /// Model identifier matched no adapter
    #[error("Unknown model provider.")]
    UnroutableModel,

    /// BYOK request arrived without its vendor credential
    #[error("{0}")]
    MissingCredential(String),

    /// Request validation failed
    #[error("Request validation failed: {0}")]
    Validation(String),

    /// Requested capability is not available
    #[error("{0}")]
    Unsupported(String),

    /// Upstream provider failure that survived the retry budget
    #[error("{0}")]
    Upstream(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// JSON error body returned on any non-OK response
///
/// The `{ "error": "..." }` shape is what the client stream consumer
/// expects when a request fails before any SSE frame is emitted.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message
    pub error: String,
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unsupported(_) => StatusCode::BAD_REQUEST,
            AppError::UnroutableModel => StatusCode::BAD_REQUEST,
            AppError::MissingCredential(_) => StatusCode::UNAUTHORIZED,
            AppError::NoCredentials => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::Serialization(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short machine-readable error category, used in logs
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::NoCredentials => "no_credentials",
            AppError::UnroutableModel => "unknown_provider",
            AppError::MissingCredential(_) => "missing_credential",
            AppError::Validation(_) => "invalid_request",
            AppError::Unsupported(_) => "unsupported",
            AppError::Upstream(_) => "upstream_error",
            AppError::Serialization(_) => "serialization_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Whether detailed error information should be logged
    pub fn should_log_details(&self) -> bool {
        !matches!(self, AppError::MissingCredential(_) | AppError::Validation(_))
    }
}

/// Allow errors to be returned directly as HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.should_log_details() {
            tracing::error!("Application error [{}]: {} - Status code: {}", self.error_type(), self, status);
        } else {
            tracing::warn!("Client error [{}]: {} - Status code: {}", self.error_type(), self, status);
        }

        let body = ErrorBody { error: self.to_string() };

        (status, Json(body)).into_response()
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;
