//! # Permit Catalog API
//!
//! Read-only access to the active permit types, their fees and the
//! document categories each one requires.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use permits_core::PermitTypeId;
use permits_state::PermitType;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct PermitTypeResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Decimal string in KES, e.g. "2500.00".
    pub fee: String,
    pub is_active: bool,
    pub required_documents: Vec<RequiredDocument>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequiredDocument {
    pub document_type: String,
    pub label: String,
}

impl From<PermitType> for PermitTypeResponse {
    fn from(p: PermitType) -> Self {
        Self {
            id: *p.id.as_uuid(),
            name: p.name,
            description: p.description,
            fee: p.fee.to_decimal_string(),
            is_active: p.is_active,
            required_documents: p
                .required_documents
                .iter()
                .map(|d| RequiredDocument {
                    document_type: d.as_str().to_string(),
                    label: d.label().to_string(),
                })
                .collect(),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/permit-types", get(list_permit_types))
        .route("/v1/permit-types/{id}", get(get_permit_type))
}

/// GET /v1/permit-types: Active permit types.
#[utoipa::path(
    get,
    path = "/v1/permit-types",
    responses(
        (status = 200, description = "Active permit types", body = Vec<PermitTypeResponse>),
    ),
    tag = "permit-types"
)]
pub(crate) async fn list_permit_types(
    State(state): State<AppState>,
) -> Result<Json<Vec<PermitTypeResponse>>, AppError> {
    let permits = state.service.list_permit_types().await?;
    Ok(Json(permits.into_iter().map(Into::into).collect()))
}

/// GET /v1/permit-types/{id}: One permit type.
#[utoipa::path(
    get,
    path = "/v1/permit-types/{id}",
    params(("id" = Uuid, Path, description = "Permit type ID")),
    responses(
        (status = 200, description = "Permit type found", body = PermitTypeResponse),
        (status = 404, description = "Permit type not found", body = crate::error::ErrorBody),
    ),
    tag = "permit-types"
)]
pub(crate) async fn get_permit_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PermitTypeResponse>, AppError> {
    let permit = state
        .service
        .get_permit_type(PermitTypeId::from_uuid(id))
        .await?;
    Ok(Json(permit.into()))
}
