//! Application error type.
//!
//! Every fallible operation in the workspace returns [`AppResult`]. The
//! variants follow the tracking-number failure taxonomy and map onto HTTP
//! status codes through [`IntoResponse`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used across services.
pub type AppResult<T> = Result<T, AppError>;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// The incoming request failed validation.
    #[error("invalid request: {field} {reason}")]
    InvalidRequest { field: String, reason: String },

    /// `createdAt` could not be parsed while building the record.
    #[error("invalid created_at format: {0}")]
    TimestampParse(String),

    /// No unique tracking number could be found within the attempt budget.
    #[error("unable to generate unique tracking number after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    /// The store failed to answer an existence check.
    #[error("failed to verify tracking number uniqueness: {0}")]
    UniquenessCheck(String),

    /// The store rejected or failed a save.
    #[error("failed to save tracking record: {0}")]
    Persistence(String),

    /// The store's unique index rejected a tracking number that was already taken.
    #[error("tracking number already issued: {0}")]
    DuplicateTrackingNumber(String),

    /// Any other failure during generation.
    #[error("tracking number generation failed: {0}")]
    Generation(String),

    /// No record for the requested tracking number.
    #[error("tracking number not found: {0}")]
    NotFound(String),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Builds an [`AppError::InvalidRequest`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. } | Self::TimestampParse(_))
    }

    /// Stable machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "INVALID_REQUEST",
            Self::TimestampParse(_) => "INVALID_TIMESTAMP",
            Self::GenerationExhausted { .. } => "GENERATION_EXHAUSTED",
            Self::UniquenessCheck(_) => "UNIQUENESS_CHECK_FAILED",
            Self::Persistence(_) | Self::DuplicateTrackingNumber(_) => "PERSISTENCE_FAILURE",
            Self::Generation(_) => "GENERATION_FAILED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// HTTP status for the error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } | Self::TimestampParse(_) => StatusCode::BAD_REQUEST,
            Self::GenerationExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::InvalidRequest { field, .. } => ApiResponse::err_with_details(
                self.code(),
                self.to_string(),
                json!({ "field": field }),
            ),
            _ => ApiResponse::err(self.code(), self.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_error_is_client_error() {
        assert!(AppError::TimestampParse("yesterday".into()).is_client_error());
        assert!(AppError::invalid("weight", "must be positive").is_client_error());
        assert!(!AppError::GenerationExhausted { attempts: 5 }.is_client_error());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::TimestampParse("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::GenerationExhausted { attempts: 5 }.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Persistence("down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_exhausted_message_names_attempts() {
        let err = AppError::GenerationExhausted { attempts: 5 };
        assert!(err.to_string().contains("after 5 attempts"));
    }
}
