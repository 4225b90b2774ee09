//! # Permit Service
//!
//! Orchestrates the pure lifecycle logic in `permits-state` against a
//! [`PermitStore`]. Each operation loads what it needs, lets the domain
//! decide, and writes the outcome in one store call so that an
//! application, its documents and its history event land together or not
//! at all.
//!
//! Reads take the caller's [`CallerIdentity`]; writes take an [`Actor`]
//! whose user must be registered.

use std::sync::Arc;

use thiserror::Error;

use permits_core::{
    ApplicationId, ApplicationNumber, BusinessDetails, BusinessDetailsInput, Fee, FieldViolation,
    PaymentId, PermitTypeId, PhoneNumber, Role, Timestamp, UserId, ValidationError,
};
use permits_state::{
    missing_categories, project_timeline, validate_batch, Actor, Application, ApplicationStatus,
    Document, DocumentError, DocumentUpload, LifecycleError, PermitType, StatusHistoryEvent,
    TimelineEntry,
};

use crate::auth::CallerIdentity;
use crate::model::{ApplicationFilter, Payment, PaymentMethod, PaymentStatus, User};
use crate::store::{NewApplication, PermitStore, StoreError, TransitionWrite};

/// Attempts at finding a free application number before giving up.
const NUMBER_ATTEMPTS: usize = 3;

/// Applications shown on the citizen dashboard.
const RECENT_APPLICATIONS: usize = 5;

/// Shown when a history actor is no longer resolvable.
const UNKNOWN_ACTOR: &str = "Unknown user";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Documents(#[from] DocumentError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The acting user has no account.
    #[error("register an account before using the portal")]
    UnknownUser,

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ─── Inputs & outputs ────────────────────────────────────────────────

/// Account details supplied at sign-up.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    /// `"officer"` registers an officer; anything else a citizen.
    pub account_type: Option<String>,
    pub phone_number: Option<String>,
    pub id_number: Option<String>,
}

/// What the payment collaborator needs to collect a fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub amount: Fee,
    pub application_id: ApplicationId,
    pub application_number: ApplicationNumber,
    pub reference: String,
}

/// A payment outcome reported by the payment collaborator.
#[derive(Debug, Clone)]
pub struct PaymentCallback {
    pub application_number: ApplicationNumber,
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    /// When present, must equal the permit fee.
    pub amount: Option<Fee>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub application: Application,
    pub payment: Payment,
    /// The transaction had already been recorded; nothing changed.
    pub replayed: bool,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub recent: Vec<Application>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfficerStats {
    pub total_applications: usize,
    pub pending_review: usize,
    pub approved_today: i64,
    pub rejected_today: i64,
}

// ─── Service ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PermitService {
    store: Arc<dyn PermitStore>,
}

impl PermitService {
    pub fn new(store: Arc<dyn PermitStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn PermitStore> {
        &self.store
    }

    // ── Catalog ──────────────────────────────────────────────────────

    pub async fn list_permit_types(&self) -> Result<Vec<PermitType>, ServiceError> {
        Ok(self.store.list_permit_types(true).await?)
    }

    pub async fn get_permit_type(&self, id: PermitTypeId) -> Result<PermitType, ServiceError> {
        self.store
            .get_permit_type(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("permit type {id}")))
    }

    /// An active permit type. Inactive ones are reported as not found.
    async fn active_permit_type(&self, id: PermitTypeId) -> Result<PermitType, ServiceError> {
        match self.store.get_permit_type(id).await? {
            Some(permit) if permit.is_active => Ok(permit),
            _ => Err(ServiceError::NotFound(format!("permit type {id}"))),
        }
    }

    // ── Users ────────────────────────────────────────────────────────

    pub async fn register_user(
        &self,
        id: UserId,
        registration: Registration,
    ) -> Result<User, ServiceError> {
        let user = build_user(id, registration, Timestamp::now())?;
        match self.store.insert_user(&user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(key)) if key.contains("email") => {
                return Err(ServiceError::Conflict(
                    "an account with this email already exists".into(),
                ))
            }
            Err(StoreError::Duplicate(_)) => {
                return Err(ServiceError::Conflict("this user is already registered".into()))
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, ServiceError> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {id}")))
    }

    async fn require_registered(&self, actor: Actor) -> Result<(), ServiceError> {
        if actor.role == Role::System {
            return Ok(());
        }
        match self.store.get_user(actor.id).await? {
            Some(user) if user.is_active => Ok(()),
            _ => Err(ServiceError::UnknownUser),
        }
    }

    // ── Applications ─────────────────────────────────────────────────

    /// Create a submitted application with its complete document batch.
    pub async fn create_application(
        &self,
        actor: Actor,
        permit_type_id: PermitTypeId,
        business: BusinessDetailsInput,
        uploads: Vec<DocumentUpload>,
    ) -> Result<Application, ServiceError> {
        self.require_registered(actor).await?;
        let business = BusinessDetails::parse(business)?;
        let permit = self.active_permit_type(permit_type_id).await?;
        let now = Timestamp::now();

        let (application, event) = Application::submitted(actor.id, &permit, business, now)?;
        let documents = validate_batch(application.id, uploads, &permit.required_documents, now)?;

        let application = self.insert_new(application, documents, event).await?;
        metrics::counter!("applications_submitted_total").increment(1);
        tracing::info!(
            application_number = %application.application_number,
            permit_type = %permit.name,
            "application submitted"
        );
        Ok(application)
    }

    /// Save an application as a draft without documents.
    pub async fn save_draft(
        &self,
        actor: Actor,
        permit_type_id: PermitTypeId,
        business: BusinessDetailsInput,
    ) -> Result<Application, ServiceError> {
        self.require_registered(actor).await?;
        let business = BusinessDetails::parse(business)?;
        let permit = self.active_permit_type(permit_type_id).await?;
        let (application, event) =
            Application::draft(actor.id, &permit, business, Timestamp::now())?;
        let application = self.insert_new(application, Vec::new(), event).await?;
        tracing::info!(application_number = %application.application_number, "draft saved");
        Ok(application)
    }

    /// Insert, drawing a new number if the generated one is taken.
    async fn insert_new(
        &self,
        mut application: Application,
        documents: Vec<Document>,
        event: StatusHistoryEvent,
    ) -> Result<Application, ServiceError> {
        let mut attempt = 1;
        loop {
            let result = self
                .store
                .insert_application(NewApplication {
                    application: application.clone(),
                    documents: documents.clone(),
                    event: event.clone(),
                })
                .await;
            match result {
                Ok(()) => return Ok(application),
                Err(StoreError::Duplicate(key))
                    if key.contains("application_number") && attempt < NUMBER_ATTEMPTS =>
                {
                    tracing::warn!(
                        application_number = %application.application_number,
                        attempt,
                        "application number taken, drawing another"
                    );
                    application.application_number =
                        ApplicationNumber::generate(application.created_at);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Submit a draft with its document batch.
    pub async fn submit_draft(
        &self,
        actor: Actor,
        number: &ApplicationNumber,
        uploads: Vec<DocumentUpload>,
    ) -> Result<Application, ServiceError> {
        self.require_registered(actor).await?;
        let mut application = self.load(number).await?;
        let expected_version = application.version;
        let now = Timestamp::now();

        let event = application.transition(actor, ApplicationStatus::Submitted, None, now)?;
        let permit = self.get_permit_type(application.permit_type_id).await?;
        let documents = validate_batch(application.id, uploads, &permit.required_documents, now)?;

        self.store
            .apply_transition(TransitionWrite {
                application: application.clone(),
                expected_version,
                documents,
                event,
                payment: None,
            })
            .await?;
        record_transition(&application, actor);
        Ok(application)
    }

    /// Move an application to `to`.
    ///
    /// `expected_version`, when given, must match the stored version.
    pub async fn transition_status(
        &self,
        actor: Actor,
        number: &ApplicationNumber,
        to: ApplicationStatus,
        comment: Option<&str>,
        expected_version: Option<i64>,
    ) -> Result<Application, ServiceError> {
        self.require_registered(actor).await?;
        let mut application = self.load(number).await?;
        if expected_version.is_some_and(|v| v != application.version) {
            return Err(StoreError::VersionConflict.into());
        }
        let version_read = application.version;
        let event = application.transition(actor, to, comment, Timestamp::now())?;

        if to == ApplicationStatus::Submitted {
            let attached = self.store.list_documents(application.id).await?;
            if attached.is_empty() {
                return Err(DocumentError::Empty.into());
            }
            let permit = self.get_permit_type(application.permit_type_id).await?;
            let missing = missing_categories(
                attached.iter().map(|d| d.document_type),
                &permit.required_documents,
            );
            if !missing.is_empty() {
                return Err(DocumentError::IncompleteSet { missing }.into());
            }
        }

        self.store
            .apply_transition(TransitionWrite {
                application: application.clone(),
                expected_version: version_read,
                documents: Vec::new(),
                event,
                payment: None,
            })
            .await?;
        record_transition(&application, actor);
        Ok(application)
    }

    async fn load(&self, number: &ApplicationNumber) -> Result<Application, ServiceError> {
        self.store
            .get_application(number)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("application {number}")))
    }

    /// Load an application the caller may see: staff see all, citizens
    /// their own.
    async fn load_visible(
        &self,
        caller: &CallerIdentity,
        number: &ApplicationNumber,
    ) -> Result<Application, ServiceError> {
        let application = self.load(number).await?;
        let owns = caller.user_id.is_some_and(|u| application.is_owned_by(u));
        if caller.is_staff() || owns {
            Ok(application)
        } else {
            Err(LifecycleError::Forbidden.into())
        }
    }

    pub async fn get_application(
        &self,
        caller: &CallerIdentity,
        number: &ApplicationNumber,
    ) -> Result<Application, ServiceError> {
        self.load_visible(caller, number).await
    }

    pub async fn list_documents(
        &self,
        caller: &CallerIdentity,
        number: &ApplicationNumber,
    ) -> Result<Vec<Document>, ServiceError> {
        let application = self.load_visible(caller, number).await?;
        Ok(self.store.list_documents(application.id).await?)
    }

    pub async fn timeline(
        &self,
        caller: &CallerIdentity,
        number: &ApplicationNumber,
    ) -> Result<Vec<TimelineEntry>, ServiceError> {
        let application = self.load_visible(caller, number).await?;
        let events = self.store.list_history(application.id).await?;
        let mut actors: Vec<UserId> = events.iter().map(|e| e.updated_by).collect();
        actors.sort();
        actors.dedup();
        let names = self.store.user_names(&actors).await?;
        Ok(project_timeline(&events, |id| {
            names
                .get(&id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_ACTOR.to_string())
        }))
    }

    /// The caller's own applications, newest first.
    pub async fn my_applications(&self, owner: UserId) -> Result<Vec<Application>, ServiceError> {
        Ok(self
            .store
            .list_applications(&ApplicationFilter::owned_by(owner))
            .await?)
    }

    // ── Payments ─────────────────────────────────────────────────────

    /// Prepare an application for fee collection.
    ///
    /// APPROVED and SUBMITTED applications are moved to PAYMENT_PENDING by
    /// the system user; one already pending is returned as is.
    pub async fn initiate_payment(
        &self,
        caller: &CallerIdentity,
        number: &ApplicationNumber,
    ) -> Result<PaymentIntent, ServiceError> {
        let mut application = self.load_visible(caller, number).await?;
        let permit = self.get_permit_type(application.permit_type_id).await?;

        match application.status {
            ApplicationStatus::PaymentPending => {}
            ApplicationStatus::Approved | ApplicationStatus::Submitted => {
                let expected_version = application.version;
                let event = application.transition(
                    Actor::system(),
                    ApplicationStatus::PaymentPending,
                    None,
                    Timestamp::now(),
                )?;
                self.store
                    .apply_transition(TransitionWrite {
                        application: application.clone(),
                        expected_version,
                        documents: Vec::new(),
                        event,
                        payment: None,
                    })
                    .await?;
                record_transition(&application, Actor::system());
            }
            from => {
                return Err(LifecycleError::InvalidTransition {
                    from,
                    to: ApplicationStatus::PaymentPending,
                }
                .into())
            }
        }

        Ok(PaymentIntent {
            amount: permit.fee,
            application_id: application.id,
            reference: application.application_number.to_string(),
            application_number: application.application_number,
        })
    }

    /// Record a payment outcome. A transaction id already on record is
    /// acknowledged without any change.
    pub async fn complete_payment(
        &self,
        callback: PaymentCallback,
    ) -> Result<PaymentOutcome, ServiceError> {
        let mut application = self.load(&callback.application_number).await?;
        if let Some(outcome) = self.replayed(&callback, &application).await? {
            return Ok(outcome);
        }

        let permit = self.get_permit_type(application.permit_type_id).await?;
        if callback.amount.is_some_and(|a| a != permit.fee) {
            return Err(ValidationError::field(
                "amount",
                format!("amount must equal the permit fee of {}", permit.fee),
            )
            .into());
        }
        let now = Timestamp::now();
        let payment = Payment {
            id: PaymentId::new(),
            application_id: application.id,
            transaction_id: callback.transaction_id.clone(),
            amount: permit.fee,
            method: callback.method,
            status: callback.status,
            reported_at: callback.timestamp,
            created_at: now,
        };

        let written = match callback.status {
            PaymentStatus::Success => {
                let expected_version = application.version;
                let event = application.transition(
                    Actor::system(),
                    ApplicationStatus::Completed,
                    None,
                    now,
                )?;
                self.store
                    .apply_transition(TransitionWrite {
                        application: application.clone(),
                        expected_version,
                        documents: Vec::new(),
                        event,
                        payment: Some(payment.clone()),
                    })
                    .await
            }
            PaymentStatus::Failed => self.store.insert_payment(&payment).await,
        };

        match written {
            Ok(()) => {
                if callback.status == PaymentStatus::Success {
                    record_transition(&application, Actor::system());
                } else {
                    tracing::info!(
                        application_number = %application.application_number,
                        transaction_id = %payment.transaction_id,
                        "payment failure recorded"
                    );
                }
                Ok(PaymentOutcome {
                    application,
                    payment,
                    replayed: false,
                })
            }
            // A concurrent delivery of the same callback won the race.
            Err(StoreError::Duplicate(_)) | Err(StoreError::VersionConflict) => {
                let current = self.load(&callback.application_number).await?;
                match self.replayed(&callback, &current).await? {
                    Some(outcome) => Ok(outcome),
                    None => Err(StoreError::VersionConflict.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn replayed(
        &self,
        callback: &PaymentCallback,
        application: &Application,
    ) -> Result<Option<PaymentOutcome>, ServiceError> {
        let Some(payment) = self.store.find_payment(&callback.transaction_id).await? else {
            return Ok(None);
        };
        if payment.application_id != application.id {
            return Err(ServiceError::Conflict(format!(
                "transaction {} belongs to another application",
                callback.transaction_id
            )));
        }
        tracing::info!(
            transaction_id = %payment.transaction_id,
            "payment callback replayed"
        );
        Ok(Some(PaymentOutcome {
            application: application.clone(),
            payment,
            replayed: true,
        }))
    }

    // ── Dashboards ───────────────────────────────────────────────────

    pub async fn dashboard(&self, owner: UserId) -> Result<Dashboard, ServiceError> {
        let applications = self.my_applications(owner).await?;
        let count = |pred: fn(&ApplicationStatus) -> bool| {
            applications.iter().filter(|a| pred(&a.status)).count()
        };
        Ok(Dashboard {
            total: applications.len(),
            pending: count(ApplicationStatus::is_pending),
            approved: count(|s| {
                matches!(s, ApplicationStatus::Approved | ApplicationStatus::Completed)
            }),
            rejected: count(|s| *s == ApplicationStatus::Rejected),
            recent: applications.iter().take(RECENT_APPLICATIONS).cloned().collect(),
        })
    }

    /// Applications for review. Drafts are only listed when asked for by
    /// status.
    pub async fn officer_queue(
        &self,
        filter: ApplicationFilter,
    ) -> Result<Vec<Application>, ServiceError> {
        let filter = ApplicationFilter {
            owner: None,
            include_drafts: false,
            ..filter
        };
        Ok(self.store.list_applications(&filter).await?)
    }

    pub async fn officer_stats(&self) -> Result<OfficerStats, ServiceError> {
        let all = self
            .store
            .list_applications(&ApplicationFilter::default())
            .await?;
        let today = Timestamp::now().start_of_day();
        Ok(OfficerStats {
            total_applications: all.len(),
            pending_review: all
                .iter()
                .filter(|a| {
                    matches!(
                        a.status,
                        ApplicationStatus::Submitted | ApplicationStatus::UnderReview
                    )
                })
                .count(),
            approved_today: self
                .store
                .count_transitions_since(ApplicationStatus::Approved, today)
                .await?,
            rejected_today: self
                .store
                .count_transitions_since(ApplicationStatus::Rejected, today)
                .await?,
        })
    }
}

fn record_transition(application: &Application, actor: Actor) {
    metrics::counter!("application_transitions_total", "to" => application.status.as_str())
        .increment(1);
    tracing::info!(
        application_number = %application.application_number,
        status = %application.status,
        actor = %actor.id,
        version = application.version,
        "application status changed"
    );
}

fn build_user(id: UserId, reg: Registration, now: Timestamp) -> Result<User, ValidationError> {
    let mut violations = Vec::new();

    let full_name = reg.full_name.split_whitespace().collect::<Vec<_>>();
    if full_name.is_empty() {
        violations.push(FieldViolation::new("full_name", "Full name is required"));
    }

    let email = reg.email.trim().to_lowercase();
    if !plausible_email(&email) {
        violations.push(FieldViolation::new("email", "Invalid email address"));
    }

    let phone_number = match reg.phone_number.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match PhoneNumber::parse(raw) {
            Some(phone) => Some(phone.as_str().to_string()),
            None => {
                violations.push(FieldViolation::new("phone_number", "Invalid phone number"));
                None
            }
        },
    };

    if !violations.is_empty() {
        return Err(ValidationError::Fields(violations));
    }

    let role = match reg.account_type.as_deref().map(str::trim) {
        Some(t) if t.eq_ignore_ascii_case("officer") => Role::Officer,
        _ => Role::Citizen,
    };
    let (first_name, last_name) = match full_name.split_first() {
        Some((first, rest)) => (first.to_string(), rest.join(" ")),
        None => (String::new(), String::new()),
    };

    Ok(User {
        id,
        email,
        first_name,
        last_name,
        phone_number,
        id_number: reg
            .id_number
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        role,
        is_active: true,
        created_at: now,
    })
}

fn plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
