//! # Users API
//!
//! Account registration for the identity bound to the caller's token, and
//! the caller's own profile.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::model::User;
use crate::service::Registration;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterUserRequest {
    pub full_name: String,
    pub email: String,
    /// "citizen" (default) or "officer".
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub id_number: Option<String>,
}

impl Validate for RegisterUserRequest {
    fn validate(&self) -> Result<(), String> {
        match self.account_type.as_deref().map(str::trim) {
            None | Some("") => Ok(()),
            Some(t) if t.eq_ignore_ascii_case("citizen") || t.eq_ignore_ascii_case("officer") => {
                Ok(())
            }
            Some(t) => Err(format!("unknown account_type '{t}'")),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub phone_number: Option<String>,
    pub id_number: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: *u.id.as_uuid(),
            display_name: u.display_name(),
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            phone_number: u.phone_number,
            id_number: u.id_number,
            role: u.role.as_str().to_string(),
            is_active: u.is_active,
            created_at: *u.created_at.as_datetime(),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/users", post(register_user))
        .route("/v1/users/me", get(current_user))
}

/// POST /v1/users: Register the caller's account.
#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Account registered", body = UserResponse),
        (status = 409, description = "Email or user already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn register_user(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let id = caller.require_user()?;
    let req = extract_validated_json(body)?;
    let wants_officer = req
        .account_type
        .as_deref()
        .is_some_and(|t| t.trim().eq_ignore_ascii_case("officer"));
    if wants_officer && !caller.is_staff() {
        return Err(AppError::Forbidden(
            "officer accounts require an officer token".into(),
        ));
    }
    let user = state
        .service
        .register_user(
            id,
            Registration {
                full_name: req.full_name,
                email: req.email,
                account_type: req.account_type,
                phone_number: req.phone_number,
                id_number: req.id_number,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /v1/users/me: The caller's profile.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    responses(
        (status = 200, description = "Caller's profile", body = UserResponse),
        (status = 404, description = "Not registered", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn current_user(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<UserResponse>, AppError> {
    let id = caller.require_user()?;
    Ok(Json(state.service.get_user(id).await?.into()))
}
