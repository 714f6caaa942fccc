// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or missing input; caller-fixable, never retried.
    #[error("Invalid request: {message}")]
    Validation {
        message: String,
        fields: Vec<String>,
    },

    /// Referenced entity does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad credentials or invalid/expired/tampered token.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Account exists but has not been approved by an administrator.
    /// Surfaced distinctly so pending users see a different response
    /// than bad-credential users.
    #[error("Account pending approval")]
    PendingApproval,

    /// Caller is authenticated but lacks the required role.
    #[error("Permission denied")]
    Forbidden,

    /// Duplicate unique key (e.g. phone number already registered).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store or object-store I/O failure on the primary path.
    #[error("Database error: {0}")]
    Database(String),

    /// Object-store failure on the primary path.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Required secret material absent. Fails the specific operation;
    /// never falls back to a default secret.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn validation_fields(message: impl Into<String>, fields: Vec<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            fields,
        }
    }
}

/// JSON error response body.
///
/// Every failure carries a success flag and a human-readable message;
/// validation errors add the offending field names. Internal details
/// are logged, never returned.
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message, fields) = match &self {
            AppError::Validation { message, fields } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message.clone(),
                fields.clone(),
            ),
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, "not_found", msg.clone(), Vec::new())
            }
            AppError::Auth(msg) => (
                StatusCode::UNAUTHORIZED,
                "auth_error",
                msg.clone(),
                Vec::new(),
            ),
            AppError::PendingApproval => (
                StatusCode::FORBIDDEN,
                "pending_approval",
                "Account is awaiting administrator approval".to_string(),
                Vec::new(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "Permission denied".to_string(),
                Vec::new(),
            ),
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, "conflict", msg.clone(), Vec::new())
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A storage backend error occurred".to_string(),
                    Vec::new(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Object store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    "A storage backend error occurred".to_string(),
                    Vec::new(),
                )
            }
            AppError::Configuration(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "configuration_error",
                    "Server is misconfigured for this operation".to_string(),
                    Vec::new(),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    Vec::new(),
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            error: error.to_string(),
            message,
            fields,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
