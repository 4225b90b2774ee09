//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented handlers into one OpenAPI document served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "County Permits Portal API",
        version = "0.1.0",
        description = "Business permit applications for the county: catalog, submission with documents, officer review, status timeline and fee payment.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Catalog
        crate::routes::permits::list_permit_types,
        crate::routes::permits::get_permit_type,
        // Users
        crate::routes::users::register_user,
        crate::routes::users::current_user,
        // Applications
        crate::routes::applications::create_application,
        crate::routes::applications::list_my_applications,
        crate::routes::applications::save_draft,
        crate::routes::applications::get_application,
        crate::routes::applications::list_documents,
        crate::routes::applications::get_timeline,
        crate::routes::applications::submit_draft,
        crate::routes::applications::update_status,
        // Dashboards
        crate::routes::officer::dashboard,
        crate::routes::officer::officer_queue,
        crate::routes::officer::officer_stats,
        // Payments
        crate::routes::payments::initiate_payment,
        crate::routes::payments::payment_callback,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::permits::PermitTypeResponse,
        crate::routes::permits::RequiredDocument,
        crate::routes::users::RegisterUserRequest,
        crate::routes::users::UserResponse,
        crate::routes::applications::BusinessFields,
        crate::routes::applications::DocumentUploadRequest,
        crate::routes::applications::CreateApplicationRequest,
        crate::routes::applications::DraftRequest,
        crate::routes::applications::SubmitDraftRequest,
        crate::routes::applications::StatusUpdateRequest,
        crate::routes::applications::ApplicationResponse,
        crate::routes::applications::DocumentResponse,
        crate::routes::applications::TimelineEntryResponse,
        crate::routes::officer::DashboardResponse,
        crate::routes::officer::OfficerStatsResponse,
        crate::routes::payments::PaymentIntentResponse,
        crate::routes::payments::PaymentCallbackRequest,
        crate::routes::payments::PaymentCallbackResponse,
    )),
    tags(
        (name = "permit-types", description = "Permit catalog"),
        (name = "users", description = "Accounts"),
        (name = "applications", description = "Applications, documents and timeline"),
        (name = "dashboard", description = "Citizen dashboard"),
        (name = "officer", description = "Officer review queue"),
        (name = "payments", description = "Fee collection"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
