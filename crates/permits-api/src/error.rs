//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Domain errors from `permits-core`, `permits-state` and the service layer
//! are mapped here to HTTP status codes and one JSON body shape:
//!
//! ```json
//! {"error": {"code": "INCOMPLETE_SET", "message": "...", "details": {...}}}
//! ```
//!
//! Internal error details are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use permits_core::{DocumentType, FieldViolation, ValidationError};
use permits_state::{DocumentError, LifecycleError};

use crate::service::ServiceError;
use crate::store::StoreError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. `NOT_FOUND`, `INCOMPLETE_SET`).
    pub code: String,
    pub message: String,
    /// Field violations or missing document categories, for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Form validation failed on named fields (422).
    #[error("validation error: {}", ValidationError::Fields(.0.clone()))]
    InvalidFields(Vec<FieldViolation>),

    /// No documents, or a document without a resolvable URL (422).
    #[error("incomplete submission: {0}")]
    IncompleteSubmission(String),

    /// Required document categories are missing (422).
    #[error("{message}")]
    IncompleteSet {
        message: String,
        missing: Vec<DocumentType>,
    },

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller may not perform the operation (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Status change not in the transition table (409).
    #[error("{0}")]
    InvalidTransition(String),

    /// Concurrent update or duplicate resource (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) | Self::InvalidFields(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
            }
            Self::IncompleteSubmission(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INCOMPLETE_SUBMISSION")
            }
            Self::IncompleteSet { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "INCOMPLETE_SET"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::InvalidTransition(_) => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::InvalidFields(violations) => {
                Some(serde_json::json!({ "fields": violations }))
            }
            Self::IncompleteSet { missing, .. } => {
                Some(serde_json::json!({ "missing_documents": missing }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

// ─── Domain conversions ──────────────────────────────────────────────

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Fields(violations) => Self::InvalidFields(violations),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Unauthorized { .. } | LifecycleError::Forbidden => {
                Self::Forbidden(err.to_string())
            }
            LifecycleError::InvalidTransition { .. } => Self::InvalidTransition(err.to_string()),
            LifecycleError::Validation(v) => v.into(),
            LifecycleError::PermitInactive(_) => Self::NotFound(err.to_string()),
        }
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::IncompleteSet { ref missing } => Self::IncompleteSet {
                missing: missing.clone(),
                message: err.to_string(),
            },
            DocumentError::Invalid { .. } => Self::Validation(err.to_string()),
            DocumentError::Empty | DocumentError::MissingUrl { .. } => {
                Self::IncompleteSubmission(err.to_string())
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::VersionConflict => Self::Conflict(err.to_string()),
            StoreError::Duplicate(_) => Self::Conflict(err.to_string()),
            StoreError::Transient(_) | StoreError::Backend(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Lifecycle(e) => e.into(),
            ServiceError::Documents(e) => e.into(),
            ServiceError::Validation(e) => e.into(),
            ServiceError::Store(e) => e.into(),
            ServiceError::NotFound(what) => Self::NotFound(what),
            ServiceError::Conflict(msg) => Self::Conflict(msg),
            ServiceError::UnknownUser => Self::Forbidden(err.to_string()),
        }
    }
}
