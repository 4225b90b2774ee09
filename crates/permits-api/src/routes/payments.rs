//! # Payments API
//!
//! Fee collection is handed to an external payment collaborator. The portal
//! prepares the application (`POST /v1/applications/{number}/payment`) and
//! later receives the outcome on `POST /v1/payments/callback`.
//!
//! The callback is mounted outside bearer auth. It is authenticated by the
//! `X-Payment-Signature` header, compared in constant time against
//! `PAYMENT_WEBHOOK_SECRET`. With no secret configured every callback is
//! refused.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use permits_core::{Fee, Timestamp};

use crate::auth::{constant_time_token_eq, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{application_number, extract_json};
use crate::model::{PaymentMethod, PaymentStatus};
use crate::service::PaymentCallback;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-payment-signature";

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentIntentResponse {
    /// Decimal string in KES.
    pub amount: String,
    pub application_id: Uuid,
    pub application_number: String,
    /// Reference the payer quotes to the payment collaborator.
    pub reference: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentCallbackRequest {
    pub application_number: String,
    pub transaction_id: String,
    /// SUCCESS or FAILED.
    pub status: String,
    /// MPESA, CARD or BANK.
    pub method: String,
    /// Decimal string; must equal the permit fee when present.
    #[serde(default)]
    pub amount: Option<String>,
    /// ISO 8601 UTC.
    pub timestamp: String,
}

impl PaymentCallbackRequest {
    fn into_callback(self) -> Result<PaymentCallback, AppError> {
        let transaction_id = self.transaction_id.trim().to_string();
        if transaction_id.is_empty() {
            return Err(AppError::Validation("transaction_id must not be empty".into()));
        }
        let status = PaymentStatus::from_name(&self.status)
            .ok_or_else(|| AppError::Validation(format!("unknown payment status '{}'", self.status)))?;
        let method = PaymentMethod::from_name(&self.method)
            .ok_or_else(|| AppError::Validation(format!("unknown payment method '{}'", self.method)))?;
        let amount = self.amount.as_deref().map(Fee::parse).transpose()?;
        Ok(PaymentCallback {
            application_number: application_number(&self.application_number)?,
            transaction_id,
            status,
            method,
            amount,
            timestamp: Timestamp::parse(&self.timestamp)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentCallbackResponse {
    pub application_number: String,
    pub application_status: String,
    pub transaction_id: String,
    pub payment_status: String,
    /// The transaction had already been recorded.
    pub replayed: bool,
}

/// Authenticated payment routes.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/v1/applications/{number}/payment",
        post(initiate_payment),
    )
}

/// The collaborator callback, mounted outside bearer auth.
pub fn callback_router() -> Router<AppState> {
    Router::new().route("/v1/payments/callback", post(payment_callback))
}

/// POST /v1/applications/{number}/payment: Prepare fee collection.
#[utoipa::path(
    post,
    path = "/v1/applications/{number}/payment",
    params(("number" = String, Path, description = "Application number")),
    responses(
        (status = 200, description = "Payment intent", body = PaymentIntentResponse),
        (status = 403, description = "Not the caller's application", body = crate::error::ErrorBody),
        (status = 409, description = "Application cannot be paid in its status", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
pub(crate) async fn initiate_payment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(number): Path<String>,
) -> Result<Json<PaymentIntentResponse>, AppError> {
    let number = application_number(&number)?;
    let intent = state.service.initiate_payment(&caller, &number).await?;
    Ok(Json(PaymentIntentResponse {
        amount: intent.amount.to_decimal_string(),
        application_id: *intent.application_id.as_uuid(),
        application_number: intent.application_number.to_string(),
        reference: intent.reference,
    }))
}

/// POST /v1/payments/callback: Payment outcome from the collaborator.
#[utoipa::path(
    post,
    path = "/v1/payments/callback",
    request_body = PaymentCallbackRequest,
    params(("X-Payment-Signature" = String, Header, description = "Shared webhook secret")),
    responses(
        (status = 200, description = "Outcome recorded or already on record", body = PaymentCallbackResponse),
        (status = 401, description = "Missing or wrong signature", body = crate::error::ErrorBody),
        (status = 409, description = "Application is not awaiting payment", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
pub(crate) async fn payment_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<PaymentCallbackRequest>, JsonRejection>,
) -> Result<Json<PaymentCallbackResponse>, AppError> {
    verify_signature(&headers, state.config.payment_webhook_secret.as_deref())?;
    let callback = extract_json(body)?.into_callback()?;
    let outcome = state.service.complete_payment(callback).await?;
    Ok(Json(PaymentCallbackResponse {
        application_number: outcome.application.application_number.to_string(),
        application_status: outcome.application.status.as_str().to_string(),
        transaction_id: outcome.payment.transaction_id,
        payment_status: outcome.payment.status.as_str().to_string(),
        replayed: outcome.replayed,
    }))
}

fn verify_signature(headers: &HeaderMap, secret: Option<&str>) -> Result<(), AppError> {
    let Some(secret) = secret else {
        tracing::warn!("payment callback refused: no webhook secret configured");
        return Err(AppError::Unauthorized("payment callbacks are not enabled".into()));
    };
    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if constant_time_token_eq(provided, secret) {
        Ok(())
    } else {
        tracing::warn!("payment callback refused: bad signature");
        Err(AppError::Unauthorized("invalid payment signature".into()))
    }
}
