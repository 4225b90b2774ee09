//! # Custom Extractors & Validation
//!
//! [`Validate`] for request DTOs and helpers to extract and validate JSON
//! bodies in handlers.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use permits_core::ApplicationNumber;

use crate::error::AppError;

/// Request-shape checks beyond what serde enforces.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and run its [`Validate`] checks.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Parse an application number taken from the path.
///
/// A malformed number cannot name any application, so it is reported as
/// not found rather than as a validation failure.
pub fn application_number(raw: &str) -> Result<ApplicationNumber, AppError> {
    ApplicationNumber::parse(raw)
        .map_err(|_| AppError::NotFound(format!("application {raw} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_number_is_not_found() {
        let err = application_number("APP-abc").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn well_formed_number_parses() {
        let n = application_number("APP-1700000000000-042").unwrap();
        assert_eq!(n.as_str(), "APP-1700000000000-042");
    }
}
