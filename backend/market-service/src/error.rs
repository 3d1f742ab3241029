/// Error types for Market Service
///
/// This module defines all error types that can occur in the market-service.
/// Errors are converted to appropriate HTTP responses for API clients.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;

use crate::neighborhood::NeighborhoodError;
use crate::search::SearchLogError;
use crate::services::comment_thread::ThreadError;
use crate::services::feed_window::PaginationError;
use crate::services::geocoding::GeocodingError;
use crate::storage::ImageStoreError;

/// Result type for market-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Database operation failed
    DatabaseError(String),

    /// Object storage operation failed
    StorageError(String),

    /// Search index or other upstream collaborator failed
    UpstreamError(String),

    /// Validation failed
    ValidationError(String),

    /// Resource not found
    NotFound(String),

    /// Unauthorized access
    Unauthorized(String),

    /// Forbidden access
    Forbidden(String),

    /// Internal server error
    Internal(String),

    /// Bad request
    BadRequest(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            AppError::UpstreamError(msg) => write!(f, "Upstream error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StorageError(_) | AppError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_msg = self.to_string();

        HttpResponse::build(status).json(serde_json::json!({
            "error": error_msg,
            "status": status.as_u16(),
        }))
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<NeighborhoodError> for AppError {
    fn from(err: NeighborhoodError) -> Self {
        match err {
            NeighborhoodError::UnknownArea(_) => AppError::BadRequest(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<ThreadError> for AppError {
    fn from(err: ThreadError) -> Self {
        match err {
            ThreadError::CommentNotFound(_) => AppError::NotFound(err.to_string()),
        }
    }
}

impl From<PaginationError> for AppError {
    fn from(err: PaginationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<ImageStoreError> for AppError {
    fn from(err: ImageStoreError) -> Self {
        match err {
            ImageStoreError::NotFound(_) => AppError::NotFound(err.to_string()),
            other => AppError::StorageError(other.to_string()),
        }
    }
}

impl From<SearchLogError> for AppError {
    fn from(err: SearchLogError) -> Self {
        AppError::UpstreamError(err.to_string())
    }
}

impl From<GeocodingError> for AppError {
    fn from(err: GeocodingError) -> Self {
        match err {
            GeocodingError::EmptyRegion => AppError::BadRequest(err.to_string()),
            other => AppError::UpstreamError(other.to_string()),
        }
    }
}
