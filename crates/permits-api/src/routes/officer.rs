//! # Dashboards API
//!
//! The citizen dashboard summary and the officer review queue and daily
//! statistics.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use permits_core::PermitTypeId;
use permits_state::ApplicationStatus;

use crate::auth::{require_staff, CallerIdentity};
use crate::error::AppError;
use crate::model::ApplicationFilter;
use crate::routes::applications::ApplicationResponse;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub recent: Vec<ApplicationResponse>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QueueQuery {
    /// Status name, e.g. SUBMITTED.
    pub status: Option<String>,
    pub permit_type_id: Option<Uuid>,
    /// Matches application number or business name, case-insensitive.
    pub search: Option<String>,
}

impl QueueQuery {
    fn into_filter(self) -> Result<ApplicationFilter, AppError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => Some(
                ApplicationStatus::from_name(name)
                    .ok_or_else(|| AppError::Validation(format!("unknown status '{name}'")))?,
            ),
        };
        Ok(ApplicationFilter {
            status,
            permit_type_id: self.permit_type_id.map(PermitTypeId::from_uuid),
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            ..ApplicationFilter::default()
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OfficerStatsResponse {
    pub total_applications: usize,
    pub pending_review: usize,
    pub approved_today: i64,
    pub rejected_today: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/dashboard", get(dashboard))
        .route("/v1/officer/applications", get(officer_queue))
        .route("/v1/officer/stats", get(officer_stats))
}

/// GET /v1/dashboard: Counts and recent applications for the caller.
#[utoipa::path(
    get,
    path = "/v1/dashboard",
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardResponse),
    ),
    tag = "dashboard"
)]
pub(crate) async fn dashboard(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<DashboardResponse>, AppError> {
    let owner = caller.require_user()?;
    let d = state.service.dashboard(owner).await?;
    Ok(Json(DashboardResponse {
        total: d.total,
        pending: d.pending,
        approved: d.approved,
        rejected: d.rejected,
        recent: d.recent.into_iter().map(Into::into).collect(),
    }))
}

/// GET /v1/officer/applications: Review queue.
#[utoipa::path(
    get,
    path = "/v1/officer/applications",
    params(QueueQuery),
    responses(
        (status = 200, description = "Applications matching the filter", body = Vec<ApplicationResponse>),
        (status = 403, description = "Officer role required", body = crate::error::ErrorBody),
    ),
    tag = "officer"
)]
pub(crate) async fn officer_queue(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(query): Query<QueueQuery>,
) -> Result<Json<Vec<ApplicationResponse>>, AppError> {
    require_staff(&caller)?;
    let applications = state.service.officer_queue(query.into_filter()?).await?;
    Ok(Json(applications.into_iter().map(Into::into).collect()))
}

/// GET /v1/officer/stats: Queue size and today's decisions.
#[utoipa::path(
    get,
    path = "/v1/officer/stats",
    responses(
        (status = 200, description = "Officer statistics", body = OfficerStatsResponse),
        (status = 403, description = "Officer role required", body = crate::error::ErrorBody),
    ),
    tag = "officer"
)]
pub(crate) async fn officer_stats(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<OfficerStatsResponse>, AppError> {
    require_staff(&caller)?;
    let s = state.service.officer_stats().await?;
    Ok(Json(OfficerStatsResponse {
        total_applications: s.total_applications,
        pending_review: s.pending_review,
        approved_today: s.approved_today,
        rejected_today: s.rejected_today,
    }))
}
