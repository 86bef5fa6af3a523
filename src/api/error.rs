//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::datasource::{ErrorSource, ResourceError, StreamError};

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource call failed
    #[error("{0}")]
    Resource(#[from] ResourceError),

    /// Stream subscription or publish refused
    #[error("{0}")]
    Stream(#[from] StreamError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

fn query_status(source: ErrorSource) -> (StatusCode, &'static str) {
    match source {
        ErrorSource::Downstream => (StatusCode::BAD_GATEWAY, "DOWNSTREAM_ERROR"),
        ErrorSource::Plugin => (StatusCode::INTERNAL_SERVER_ERROR, "PLUGIN_ERROR"),
    }
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Resource(e) => match e {
                ResourceError::NotFound(_) => (StatusCode::NOT_FOUND, "UNKNOWN_RESOURCE"),
                ResourceError::MethodNotAllowed(_) => {
                    (StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED")
                }
                ResourceError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                ResourceError::Query(q) => query_status(q.error_source()),
            },
            ApiError::Stream(e) => match e {
                StreamError::NotFound(_) => (StatusCode::NOT_FOUND, "STREAM_NOT_FOUND"),
                StreamError::PermissionDenied => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
                StreamError::Query(q) => query_status(q.error_source()),
            },
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            request_id = %request_id,
            error_code = %code,
            error_message = %self,
            "API error occurred"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
