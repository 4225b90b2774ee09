//! # Applications API
//!
//! Submission, drafts, officer status changes and the read views of a
//! single application.
//!
//! ## Endpoints
//!
//! - `POST /v1/applications`: submit with a complete document set
//! - `GET /v1/applications`: the caller's applications
//! - `POST /v1/applications/drafts`: save a draft
//! - `GET /v1/applications/{number}`: one application
//! - `GET /v1/applications/{number}/documents`: attached documents
//! - `GET /v1/applications/{number}/timeline`: status timeline
//! - `POST /v1/applications/{number}/submit`: submit a draft
//! - `POST /v1/applications/{number}/status`: status change

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use permits_core::{
    BusinessDetails, BusinessDetailsInput, DocumentType, FieldViolation, PermitTypeId,
    ValidationError,
};
use permits_state::{Application, ApplicationStatus, Document, DocumentUpload, TimelineEntry};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{application_number, extract_json, extract_validated_json, Validate};
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Business details as entered on the application form.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BusinessFields {
    #[serde(default)]
    pub business_name: String,
    /// Retail, Restaurant/Food Service, Manufacturing or Professional Services.
    #[serde(default)]
    pub business_type: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub national_id: String,
    #[serde(default)]
    pub business_address: String,
}

impl From<BusinessFields> for BusinessDetailsInput {
    fn from(f: BusinessFields) -> Self {
        Self {
            business_name: f.business_name,
            business_type: f.business_type,
            phone_number: f.phone_number,
            national_id: f.national_id,
            business_address: f.business_address,
        }
    }
}

/// Metadata of a file already placed with the storage collaborator.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DocumentUploadRequest {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub mime_type: String,
    /// e.g. NATIONAL_ID_COPY, TAX_COMPLIANCE_CERTIFICATE.
    pub document_type: String,
    #[serde(default)]
    pub file_url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateApplicationRequest {
    pub permit_type_id: Uuid,
    #[serde(flatten)]
    pub business: BusinessFields,
    #[serde(default)]
    pub documents: Vec<DocumentUploadRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DraftRequest {
    pub permit_type_id: Uuid,
    #[serde(flatten)]
    pub business: BusinessFields,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitDraftRequest {
    #[serde(default)]
    pub documents: Vec<DocumentUploadRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdateRequest {
    /// Target status, e.g. UNDER_REVIEW, APPROVED, REJECTED.
    pub status: String,
    /// Required, at least 10 characters, when rejecting.
    #[serde(default)]
    pub comment: Option<String>,
    /// When set, the change only applies if the application is still at
    /// this version.
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl Validate for StatusUpdateRequest {
    fn validate(&self) -> Result<(), String> {
        if ApplicationStatus::from_name(&self.status).is_none() {
            return Err(format!("unknown status '{}'", self.status));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub application_number: String,
    pub status: String,
    pub business_name: String,
    pub business_type: String,
    pub phone_number: String,
    pub national_id: String,
    pub business_address: String,
    pub user_id: Uuid,
    pub permit_type_id: Uuid,
    pub assigned_officer_id: Option<Uuid>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl From<Application> for ApplicationResponse {
    fn from(a: Application) -> Self {
        Self {
            id: *a.id.as_uuid(),
            application_number: a.application_number.to_string(),
            status: a.status.as_str().to_string(),
            business_name: a.business.business_name,
            business_type: a.business.business_type.as_str().to_string(),
            phone_number: a.business.phone_number.as_str().to_string(),
            national_id: a.business.national_id.as_str().to_string(),
            business_address: a.business.business_address,
            user_id: *a.user_id.as_uuid(),
            permit_type_id: *a.permit_type_id.as_uuid(),
            assigned_officer_id: a.assigned_officer_id.map(|id| *id.as_uuid()),
            submitted_at: a.submitted_at.map(|t| *t.as_datetime()),
            created_at: *a.created_at.as_datetime(),
            updated_at: *a.updated_at.as_datetime(),
            version: a.version,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub file_name: String,
    pub original_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub document_type: String,
    pub document_label: String,
    pub file_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(d: Document) -> Self {
        Self {
            id: *d.id.as_uuid(),
            file_name: d.file_name,
            original_name: d.original_name,
            file_size: d.file_size,
            mime_type: d.mime_type,
            document_type: d.document_type.as_str().to_string(),
            document_label: d.document_type.label().to_string(),
            file_url: d.file_url,
            created_at: *d.created_at.as_datetime(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TimelineEntryResponse {
    pub status: String,
    pub label: String,
    /// document, check, clock, alert or payment.
    pub icon: String,
    pub actor_name: String,
    pub timestamp: DateTime<Utc>,
    pub comment: Option<String>,
    pub is_current: bool,
}

impl From<TimelineEntry> for TimelineEntryResponse {
    fn from(e: TimelineEntry) -> Self {
        Self {
            status: e.status.as_str().to_string(),
            label: e.label.to_string(),
            icon: e.icon.as_str().to_string(),
            actor_name: e.actor_name,
            timestamp: *e.timestamp.as_datetime(),
            comment: e.comment,
            is_current: e.is_current,
        }
    }
}

/// Convert upload requests, reporting every unknown document category.
pub(crate) fn document_uploads(
    requests: Vec<DocumentUploadRequest>,
) -> Result<Vec<DocumentUpload>, AppError> {
    let mut violations = Vec::new();
    let mut uploads = Vec::with_capacity(requests.len());
    for (i, r) in requests.into_iter().enumerate() {
        match DocumentType::from_name(r.document_type.trim()) {
            Some(document_type) => uploads.push(DocumentUpload {
                file_name: r.file_name,
                original_name: r.original_name,
                file_size: r.file_size,
                mime_type: r.mime_type,
                document_type,
                file_url: r.file_url,
            }),
            None => violations.push(FieldViolation::new(
                format!("documents[{i}].document_type"),
                format!("unknown document type '{}'", r.document_type),
            )),
        }
    }
    if violations.is_empty() {
        Ok(uploads)
    } else {
        Err(AppError::InvalidFields(violations))
    }
}

/// Check the whole submission form at once: business field violations
/// first, then unknown document categories, reported together.
pub(crate) fn submission_form(
    business: BusinessDetailsInput,
    documents: Vec<DocumentUploadRequest>,
) -> Result<(BusinessDetailsInput, Vec<DocumentUpload>), AppError> {
    let mut violations = match BusinessDetails::parse(business.clone()) {
        Ok(_) => Vec::new(),
        Err(ValidationError::Fields(v)) => v,
        Err(other) => return Err(other.into()),
    };
    match document_uploads(documents) {
        Ok(uploads) if violations.is_empty() => Ok((business, uploads)),
        Ok(_) => Err(AppError::InvalidFields(violations)),
        Err(AppError::InvalidFields(more)) => {
            violations.extend(more);
            Err(AppError::InvalidFields(violations))
        }
        Err(other) => Err(other),
    }
}

// ── Router ──────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/applications",
            get(list_my_applications).post(create_application),
        )
        .route("/v1/applications/drafts", post(save_draft))
        .route("/v1/applications/{number}", get(get_application))
        .route("/v1/applications/{number}/documents", get(list_documents))
        .route("/v1/applications/{number}/timeline", get(get_timeline))
        .route("/v1/applications/{number}/submit", post(submit_draft))
        .route("/v1/applications/{number}/status", post(update_status))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/applications: Submit an application with its documents.
#[utoipa::path(
    post,
    path = "/v1/applications",
    request_body = CreateApplicationRequest,
    responses(
        (status = 201, description = "Application submitted", body = ApplicationResponse),
        (status = 404, description = "Permit type not found or inactive", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid fields or incomplete document set", body = crate::error::ErrorBody),
    ),
    tag = "applications"
)]
pub(crate) async fn create_application(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateApplicationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApplicationResponse>), AppError> {
    let actor = caller.actor()?;
    let req = extract_json(body)?;
    let (business, uploads) = submission_form(req.business.into(), req.documents)?;
    let application = state
        .service
        .create_application(
            actor,
            PermitTypeId::from_uuid(req.permit_type_id),
            business,
            uploads,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(application.into())))
}

/// GET /v1/applications: The caller's applications, newest first.
#[utoipa::path(
    get,
    path = "/v1/applications",
    responses(
        (status = 200, description = "Caller's applications", body = Vec<ApplicationResponse>),
    ),
    tag = "applications"
)]
pub(crate) async fn list_my_applications(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<ApplicationResponse>>, AppError> {
    let owner = caller.require_user()?;
    let applications = state.service.my_applications(owner).await?;
    Ok(Json(applications.into_iter().map(Into::into).collect()))
}

/// POST /v1/applications/drafts: Save a draft application.
#[utoipa::path(
    post,
    path = "/v1/applications/drafts",
    request_body = DraftRequest,
    responses(
        (status = 201, description = "Draft saved", body = ApplicationResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorBody),
    ),
    tag = "applications"
)]
pub(crate) async fn save_draft(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<DraftRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApplicationResponse>), AppError> {
    let actor = caller.actor()?;
    let req = extract_json(body)?;
    let application = state
        .service
        .save_draft(
            actor,
            PermitTypeId::from_uuid(req.permit_type_id),
            req.business.into(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(application.into())))
}

/// GET /v1/applications/{number}: One application.
#[utoipa::path(
    get,
    path = "/v1/applications/{number}",
    params(("number" = String, Path, description = "Application number")),
    responses(
        (status = 200, description = "Application found", body = ApplicationResponse),
        (status = 403, description = "Not the caller's application", body = crate::error::ErrorBody),
        (status = 404, description = "Application not found", body = crate::error::ErrorBody),
    ),
    tag = "applications"
)]
pub(crate) async fn get_application(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(number): Path<String>,
) -> Result<Json<ApplicationResponse>, AppError> {
    let number = application_number(&number)?;
    let application = state.service.get_application(&caller, &number).await?;
    Ok(Json(application.into()))
}

/// GET /v1/applications/{number}/documents: Attached documents.
#[utoipa::path(
    get,
    path = "/v1/applications/{number}/documents",
    params(("number" = String, Path, description = "Application number")),
    responses(
        (status = 200, description = "Documents", body = Vec<DocumentResponse>),
        (status = 403, description = "Not the caller's application", body = crate::error::ErrorBody),
        (status = 404, description = "Application not found", body = crate::error::ErrorBody),
    ),
    tag = "applications"
)]
pub(crate) async fn list_documents(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(number): Path<String>,
) -> Result<Json<Vec<DocumentResponse>>, AppError> {
    let number = application_number(&number)?;
    let documents = state.service.list_documents(&caller, &number).await?;
    Ok(Json(documents.into_iter().map(Into::into).collect()))
}

/// GET /v1/applications/{number}/timeline: Status timeline, oldest first.
#[utoipa::path(
    get,
    path = "/v1/applications/{number}/timeline",
    params(("number" = String, Path, description = "Application number")),
    responses(
        (status = 200, description = "Timeline entries", body = Vec<TimelineEntryResponse>),
        (status = 403, description = "Not the caller's application", body = crate::error::ErrorBody),
        (status = 404, description = "Application not found", body = crate::error::ErrorBody),
    ),
    tag = "applications"
)]
pub(crate) async fn get_timeline(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(number): Path<String>,
) -> Result<Json<Vec<TimelineEntryResponse>>, AppError> {
    let number = application_number(&number)?;
    let entries = state.service.timeline(&caller, &number).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// POST /v1/applications/{number}/submit: Submit a draft with documents.
#[utoipa::path(
    post,
    path = "/v1/applications/{number}/submit",
    params(("number" = String, Path, description = "Application number")),
    request_body = SubmitDraftRequest,
    responses(
        (status = 200, description = "Draft submitted", body = ApplicationResponse),
        (status = 409, description = "Not a draft", body = crate::error::ErrorBody),
        (status = 422, description = "Incomplete document set", body = crate::error::ErrorBody),
    ),
    tag = "applications"
)]
pub(crate) async fn submit_draft(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(number): Path<String>,
    body: Result<Json<SubmitDraftRequest>, JsonRejection>,
) -> Result<Json<ApplicationResponse>, AppError> {
    let actor = caller.actor()?;
    let number = application_number(&number)?;
    let req = extract_json(body)?;
    let uploads = document_uploads(req.documents)?;
    let application = state.service.submit_draft(actor, &number, uploads).await?;
    Ok(Json(application.into()))
}

/// POST /v1/applications/{number}/status: Change an application's status.
#[utoipa::path(
    post,
    path = "/v1/applications/{number}/status",
    params(("number" = String, Path, description = "Application number")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Status changed", body = ApplicationResponse),
        (status = 403, description = "Role may not perform this change", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition or stale version", body = crate::error::ErrorBody),
        (status = 422, description = "Rejection comment too short", body = crate::error::ErrorBody),
    ),
    tag = "applications"
)]
pub(crate) async fn update_status(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(number): Path<String>,
    body: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Result<Json<ApplicationResponse>, AppError> {
    let actor = caller.actor()?;
    let number = application_number(&number)?;
    let req = extract_validated_json(body)?;
    let to = ApplicationStatus::from_name(&req.status)
        .ok_or_else(|| AppError::Validation(format!("unknown status '{}'", req.status)))?;
    let application = state
        .service
        .transition_status(
            actor,
            &number,
            to,
            req.comment.as_deref(),
            req.expected_version,
        )
        .await?;
    Ok(Json(application.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(document_type: &str) -> DocumentUploadRequest {
        DocumentUploadRequest {
            file_name: "id.pdf".into(),
            original_name: "id.pdf".into(),
            file_size: 1024,
            mime_type: "application/pdf".into(),
            document_type: document_type.into(),
            file_url: "https://files.example.org/id.pdf".into(),
        }
    }

    #[test]
    fn unknown_document_types_are_field_errors() {
        let err = document_uploads(vec![upload("NATIONAL_ID"), upload("PASSPORT")]).unwrap_err();
        match err {
            AppError::InvalidFields(v) => {
                assert_eq!(v.len(), 1);
                assert_eq!(v[0].field, "documents[1].document_type");
            }
            other => panic!("expected InvalidFields, got {other:?}"),
        }
    }

    #[test]
    fn business_and_document_errors_are_reported_together() {
        let business = BusinessDetailsInput {
            business_name: "".into(),
            business_type: "Retail".into(),
            phone_number: "+254712345678".into(),
            national_id: "12345678".into(),
            business_address: "Murang'a Town".into(),
        };
        let err = submission_form(business, vec![upload("PASSPORT")]).unwrap_err();
        match err {
            AppError::InvalidFields(v) => {
                let fields: Vec<&str> = v.iter().map(|f| f.field.as_str()).collect();
                assert!(fields.contains(&"business_name"), "{fields:?}");
                assert!(fields.contains(&"documents[0].document_type"), "{fields:?}");
                assert_eq!(*fields.last().unwrap(), "documents[0].document_type");
            }
            other => panic!("expected InvalidFields, got {other:?}"),
        }
    }

    #[test]
    fn timeline_icon_names_are_lowercase() {
        let entry = TimelineEntry {
            status: ApplicationStatus::PaymentPending,
            label: ApplicationStatus::PaymentPending.timeline_label(),
            icon: ApplicationStatus::PaymentPending.timeline_icon(),
            actor_name: "County System".into(),
            timestamp: permits_core::Timestamp::now(),
            comment: None,
            is_current: true,
        };
        assert_eq!(TimelineEntryResponse::from(entry).icon, "payment");
    }

    #[test]
    fn create_request_flattens_business_fields() {
        let req: CreateApplicationRequest = serde_json::from_value(serde_json::json!({
            "permit_type_id": Uuid::nil(),
            "business_name": "Kangema Hardware",
            "business_type": "Retail",
            "documents": []
        }))
        .unwrap();
        assert_eq!(req.business.business_name, "Kangema Hardware");
        assert_eq!(req.business.phone_number, "");
        assert!(req.documents.is_empty());
    }

    #[test]
    fn status_request_rejects_unknown_status() {
        let req = StatusUpdateRequest {
            status: "ARCHIVED".into(),
            comment: None,
            expected_version: None,
        };
        assert!(req.validate().is_err());
    }
}
