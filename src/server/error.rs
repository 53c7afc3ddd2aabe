//! API error types

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::engine::{FieldError, PredictionError, ValidationErrors};
use crate::storage::StorageError;

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// API error with HTTP status code
#[derive(Debug, Clone, Serialize, Error)]
pub struct ApiError {
    /// HTTP status code
    #[serde(skip)]
    pub status: StatusCode,

    /// Error message
    pub message: String,

    /// Optional error code for client handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Offending fields, for validation failures
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
            details: Vec::new(),
        }
    }

    /// Create a new API error with code
    pub fn with_code(
        status: StatusCode,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::new(status, message)
        }
    }

    /// 404 Not Found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::with_code(
            StatusCode::NOT_FOUND,
            format!("Resource not found: {}", resource.into()),
            "NOT_FOUND",
        )
    }

    /// 422 Unprocessable Entity
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_code(
            StatusCode::UNPROCESSABLE_ENTITY,
            message,
            "VALIDATION_ERROR",
        )
    }

    /// 422 Unprocessable Entity listing every offending field
    pub fn validation_fields(message: impl Into<String>, details: Vec<FieldError>) -> Self {
        Self {
            details,
            ..Self::validation(message)
        }
    }

    /// 422 Unprocessable Entity for one rejected query parameter
    pub fn invalid_query(field: &str, message: impl Into<String>) -> Self {
        Self::validation_fields(
            "Invalid query parameters",
            vec![FieldError::new(field, message)],
        )
    }

    /// 500 Internal Server Error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_code(
            StatusCode::INTERNAL_SERVER_ERROR,
            message,
            "INTERNAL_ERROR",
        )
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{:?}] [{}] {}", self.status, code, self.message),
            None => write!(f, "[{:?}] {}", self.status, self.message),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation_fields("Invalid prediction input", errors.errors)
    }
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        if !err.is_client_error() {
            error!("Prediction failed: {}", err);
            return Self::internal("Prediction failed");
        }
        match err {
            PredictionError::Validation(errors) => errors.into(),
            other => Self::validation(other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::InvalidLimit { .. } => Self::invalid_query("limit", err.to_string()),
            StorageError::InvalidPage { .. } => Self::invalid_query("page", err.to_string()),
            StorageError::InvalidPageSize { .. } => {
                Self::invalid_query("per_page", err.to_string())
            }
            _ => {
                error!("Storage failure: {}", err);
                Self::internal("Storage failure")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::with_code(rejection.status(), rejection.body_text(), "INVALID_JSON")
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid_query("limit", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({
            "success": false,
            "error": self.message,
            "code": self.code,
        });
        if !self.details.is_empty() {
            body["details"] = serde_json::json!(self.details);
        }

        (self.status, Json(body)).into_response()
    }
}
