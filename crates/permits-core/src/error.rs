//! # Error Types
//!
//! Validation errors raised while constructing domain primitives. Every
//! variant carries the rejected input (or the offending field) so the
//! submitter can be told exactly what to fix.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Request field name, in the wire casing (e.g. `business_name`).
    pub field: String,
    /// Human-readable message for the submitter.
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validation errors for domain primitives and submitted forms.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more form fields are missing or malformed.
    #[error("invalid fields: {}", summarize(.0))]
    Fields(Vec<FieldViolation>),

    /// Application number does not match `APP-<epoch_ms>-<3 digits>`.
    #[error("invalid application number: \"{0}\" (expected APP-<epoch_ms>-<3 digits>)")]
    InvalidApplicationNumber(String),

    /// Fee amount is negative or not a decimal with at most two fraction digits.
    #[error("invalid fee amount: \"{0}\" (expected a non-negative decimal with at most 2 fraction digits)")]
    InvalidAmount(String),

    /// Timestamp string is not valid UTC ISO 8601.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ValidationError {
    /// Shorthand for a single-field failure.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fields(vec![FieldViolation::new(field, message)])
    }

    /// The field violations carried by this error, if any.
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            Self::Fields(v) => v,
            _ => &[],
        }
    }
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}
