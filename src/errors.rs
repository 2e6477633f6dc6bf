use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use sea_orm::SqlErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Bad Request",
    "code": "CAPACITY_EXCEEDED",
    "message": "Limit exceeded. Only 40 boxes remaining for harvest in this batch.",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request", "Conflict")
    pub error: String,
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error description
    pub message: String,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{message}")]
    BusinessRule { code: &'static str, message: String },

    #[error("{message}")]
    CapacityExceeded {
        code: &'static str,
        message: String,
        remaining: i32,
        requested: i32,
    },

    #[error("Cannot transition batch from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Concurrent modification of record {0}")]
    ConcurrentModification(Uuid),

    #[error("Duplicate code: {0}")]
    DuplicateCode(String),

    #[error("{0}")]
    InsufficientStock(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Wraps a database error, promoting unique-constraint violations to
    /// [`ServiceError::DuplicateCode`] so callers can retry them.
    pub fn db_error(error: DbErr) -> Self {
        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => ServiceError::DuplicateCode(detail),
            _ => ServiceError::DatabaseError(error),
        }
    }

    pub fn not_found(resource: &str, key: &str, value: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} not found with {}: {}", resource, key, value))
    }

    pub fn business(code: &'static str, message: impl Into<String>) -> Self {
        ServiceError::BusinessRule {
            code,
            message: message.into(),
        }
    }

    /// Retryable errors are resolved by re-running the whole unit of work.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification(_) | Self::DuplicateCode(_)
        )
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::BusinessRule { .. }
            | Self::CapacityExceeded { .. }
            | Self::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::ConcurrentModification(_) | Self::DuplicateCode(_) => StatusCode::CONFLICT,
            Self::InsufficientStock(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Machine-readable error code carried in the response body.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => "INTERNAL_ERROR",
            Self::NotFound(_) => "RESOURCE_NOT_FOUND",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::BusinessRule { code, .. } | Self::CapacityExceeded { code, .. } => code,
            Self::InvalidTransition { .. } => "INVALID_STATUS_TRANSITION",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::DuplicateCode(_) => "DUPLICATE_CODE",
            Self::InsufficientStock(_) => "INSUFFICIENT_STOCK",
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            Self::DuplicateCode(_) => {
                "A concurrent request claimed the same document number, please retry".to_string()
            }
            Self::ConcurrentModification(id) => {
                format!("Record {} was modified concurrently, please retry", id)
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed with internal error");
        } else {
            tracing::warn!(error = %self, code = self.error_code(), "Request rejected");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.error_code().to_string(),
            message: self.response_message(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

pub type AppError = ServiceError;
