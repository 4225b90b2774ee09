//! # Application Lifecycle State Machine
//!
//! The application aggregate and the one authoritative transition table.
//!
//! ## Transitions
//!
//! | From            | To              | Actor                                   |
//! |-----------------|-----------------|-----------------------------------------|
//! | DRAFT           | SUBMITTED       | owner                                   |
//! | SUBMITTED       | UNDER_REVIEW    | officer (becomes the assigned officer)  |
//! | SUBMITTED       | PAYMENT_PENDING | officer or system                       |
//! | UNDER_REVIEW    | APPROVED        | officer                                 |
//! | UNDER_REVIEW    | REJECTED        | officer, comment of 10+ characters      |
//! | APPROVED        | PAYMENT_PENDING | officer or system                       |
//! | PAYMENT_PENDING | COMPLETED       | system, officer, or owner               |
//!
//! `REJECTED` and `COMPLETED` are terminal. Nothing moves backwards.
//!
//! ## Checks
//!
//! [`Application::transition`] checks, in order:
//!
//! 1. the actor's role may target the status at all (`Unauthorized`);
//! 2. the move is in the table (`InvalidTransition`);
//! 3. owner-only moves are made by the owner (`Forbidden`);
//! 4. a rejection carries a long enough reason (`Validation`).
//!
//! On success the aggregate is updated in place and the one
//! [`StatusHistoryEvent`] describing the move is returned for the caller to
//! persist together with the new row.
//!
//! ## Versioning
//!
//! `version` starts at 1 and is incremented by every transition. The event
//! appended by a transition carries the pre-transition version as its
//! `sequence`, so the creation event is sequence 0 and sequences are dense.
//! Stores compare `version` on write to detect concurrent updates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use permits_core::{
    ApplicationId, ApplicationNumber, BusinessDetails, EventId, PermitTypeId, Role, Timestamp,
    UserId, ValidationError,
};

use crate::catalog::PermitType;

/// Minimum length, in characters after trimming, of a rejection reason.
pub const MIN_REJECTION_COMMENT_CHARS: usize = 10;

// ─── Status ──────────────────────────────────────────────────────────

/// The lifecycle status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    /// Saved but not yet submitted.
    Draft,
    /// Submitted with a complete document set.
    Submitted,
    /// An officer is reviewing.
    UnderReview,
    /// Fee outstanding.
    PaymentPending,
    Approved,
    /// Terminal.
    Rejected,
    /// Terminal.
    Completed,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 7] = [
        Self::Draft,
        Self::Submitted,
        Self::UnderReview,
        Self::PaymentPending,
        Self::Approved,
        Self::Rejected,
        Self::Completed,
    ];

    /// The canonical stored name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::UnderReview => "UNDER_REVIEW",
            Self::PaymentPending => "PAYMENT_PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }

    /// Awaiting action by the county or the applicant.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::Submitted | Self::UnderReview | Self::PaymentPending
        )
    }

    /// Statuses reachable in one step from this one.
    pub fn valid_transitions(&self) -> &'static [ApplicationStatus] {
        match self {
            Self::Draft => &[Self::Submitted],
            Self::Submitted => &[Self::UnderReview, Self::PaymentPending],
            Self::UnderReview => &[Self::Approved, Self::Rejected],
            Self::Approved => &[Self::PaymentPending],
            Self::PaymentPending => &[Self::Completed],
            Self::Rejected | Self::Completed => &[],
        }
    }

    pub fn can_transition_to(&self, to: ApplicationStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Whether `role` may move any application into this status.
    fn permits_role(&self, role: Role) -> bool {
        match role {
            Role::Officer | Role::Admin => true,
            Role::System => matches!(self, Self::PaymentPending | Self::Completed),
            Role::Citizen => matches!(self, Self::Submitted | Self::Completed),
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// The actor's role may not move applications into this status.
    #[error("role {role} may not move an application to {to}")]
    Unauthorized { role: Role, to: ApplicationStatus },

    /// The actor does not own the application. The message says nothing
    /// about the application itself.
    #[error("you do not have permission to access this application")]
    Forbidden,

    #[error("invalid application transition: {from} -> {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The permit type exists but is not accepting applications.
    #[error("permit type {0} is not accepting applications")]
    PermitInactive(String),
}

// ─── Actor ───────────────────────────────────────────────────────────

/// Who is performing a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// The county system user, actor for collaborator-driven moves.
    pub fn system() -> Self {
        Self {
            id: UserId::system(),
            role: Role::System,
        }
    }
}

// ─── History ─────────────────────────────────────────────────────────

/// One append-only entry in an application's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEvent {
    pub id: EventId,
    pub application_id: ApplicationId,
    /// The status transitioned to.
    pub status: ApplicationStatus,
    pub comment: Option<String>,
    pub updated_by: UserId,
    pub created_at: Timestamp,
    /// Zero-based position in the application's history.
    pub sequence: i64,
}

// ─── Application ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub application_number: ApplicationNumber,
    pub status: ApplicationStatus,
    #[serde(flatten)]
    pub business: BusinessDetails,
    /// The owning citizen. Never changes.
    pub user_id: UserId,
    pub permit_type_id: PermitTypeId,
    pub assigned_officer_id: Option<UserId>,
    pub submitted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub version: i64,
}

impl Application {
    /// A new application in SUBMITTED, with its creation event.
    ///
    /// The caller is responsible for validating the document batch first.
    pub fn submitted(
        owner: UserId,
        permit: &PermitType,
        business: BusinessDetails,
        now: Timestamp,
    ) -> Result<(Self, StatusHistoryEvent), LifecycleError> {
        Self::create(owner, permit, business, ApplicationStatus::Submitted, now)
    }

    /// A new application in DRAFT, with its creation event.
    pub fn draft(
        owner: UserId,
        permit: &PermitType,
        business: BusinessDetails,
        now: Timestamp,
    ) -> Result<(Self, StatusHistoryEvent), LifecycleError> {
        Self::create(owner, permit, business, ApplicationStatus::Draft, now)
    }

    fn create(
        owner: UserId,
        permit: &PermitType,
        business: BusinessDetails,
        status: ApplicationStatus,
        now: Timestamp,
    ) -> Result<(Self, StatusHistoryEvent), LifecycleError> {
        if !permit.is_active {
            return Err(LifecycleError::PermitInactive(permit.name.clone()));
        }
        let application = Self {
            id: ApplicationId::new(),
            application_number: ApplicationNumber::generate(now),
            status,
            business,
            user_id: owner,
            permit_type_id: permit.id,
            assigned_officer_id: None,
            submitted_at: (status == ApplicationStatus::Submitted).then_some(now),
            created_at: now,
            updated_at: now,
            version: 1,
        };
        let event = StatusHistoryEvent {
            id: EventId::new(),
            application_id: application.id,
            status,
            comment: None,
            updated_by: owner,
            created_at: now,
            sequence: 0,
        };
        Ok((application, event))
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user_id == user
    }

    /// Apply a status transition.
    ///
    /// `comment` is trimmed; an empty comment is stored as none. The event
    /// timestamp never precedes the previous transition even if `now` does.
    pub fn transition(
        &mut self,
        actor: Actor,
        to: ApplicationStatus,
        comment: Option<&str>,
        now: Timestamp,
    ) -> Result<StatusHistoryEvent, LifecycleError> {
        if !to.permits_role(actor.role) {
            return Err(LifecycleError::Unauthorized {
                role: actor.role,
                to,
            });
        }
        if !self.status.can_transition_to(to) {
            return Err(LifecycleError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        if !self.actor_may_touch(actor, to) {
            return Err(LifecycleError::Forbidden);
        }

        let comment = comment.map(str::trim).filter(|c| !c.is_empty());
        if to == ApplicationStatus::Rejected {
            let long_enough =
                comment.is_some_and(|c| c.chars().count() >= MIN_REJECTION_COMMENT_CHARS);
            if !long_enough {
                return Err(ValidationError::field(
                    "comment",
                    format!(
                        "A rejection reason of at least {MIN_REJECTION_COMMENT_CHARS} characters is required"
                    ),
                )
                .into());
            }
        }

        let at = now.at_least(self.updated_at);
        match to {
            ApplicationStatus::UnderReview => self.assigned_officer_id = Some(actor.id),
            ApplicationStatus::Submitted if self.submitted_at.is_none() => {
                self.submitted_at = Some(at)
            }
            _ => {}
        }
        let event = StatusHistoryEvent {
            id: EventId::new(),
            application_id: self.id,
            status: to,
            comment: comment.map(str::to_string),
            updated_by: actor.id,
            created_at: at,
            sequence: self.version,
        };
        self.status = to;
        self.updated_at = at;
        self.version += 1;
        Ok(event)
    }

    /// Ownership gate for moves a citizen may make on their own application.
    fn actor_may_touch(&self, actor: Actor, to: ApplicationStatus) -> bool {
        match to {
            ApplicationStatus::Submitted => self.is_owned_by(actor.id),
            ApplicationStatus::Completed if actor.role == Role::Citizen => {
                self.is_owned_by(actor.id)
            }
            _ => true,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{default_catalog, PermitType};
    use permits_core::BusinessDetailsInput;

    fn permit() -> PermitType {
        PermitType::from_spec(default_catalog().remove(0), ts(0))
    }

    fn ts(ms: i64) -> Timestamp {
        Timestamp::from_epoch_millis(1_700_000_000_000 + ms).unwrap()
    }

    fn business() -> BusinessDetails {
        BusinessDetails::parse(BusinessDetailsInput {
            business_name: "Kangema Hardware".into(),
            business_type: "Retail".into(),
            phone_number: "+254712345678".into(),
            national_id: "12345678".into(),
            business_address: "Main Street".into(),
        })
        .unwrap()
    }

    fn officer() -> Actor {
        Actor::new(UserId::new(), Role::Officer)
    }

    fn submitted(owner: UserId) -> Application {
        Application::submitted(owner, &permit(), business(), ts(0)).unwrap().0
    }

    fn under_review(owner: UserId) -> Application {
        let mut app = submitted(owner);
        app.transition(officer(), ApplicationStatus::UnderReview, None, ts(10))
            .unwrap();
        app
    }

    // ── Status table ─────────────────────────────────────────────────

    #[test]
    fn terminal_states_have_no_transitions() {
        for s in ApplicationStatus::ALL {
            assert_eq!(s.is_terminal(), s.valid_transitions().is_empty(), "{s}");
        }
    }

    #[test]
    fn no_transition_leads_back_to_draft() {
        for s in ApplicationStatus::ALL {
            assert!(!s.can_transition_to(ApplicationStatus::Draft));
        }
    }

    #[test]
    fn status_names_round_trip() {
        for s in ApplicationStatus::ALL {
            assert_eq!(ApplicationStatus::from_name(s.as_str()), Some(s));
            let json = serde_json::to_string(&s).unwrap();
            assert_eq!(json, format!("\"{}\"", s.as_str()));
        }
        assert_eq!(ApplicationStatus::from_name("PENDING"), None);
    }

    // ── Creation ─────────────────────────────────────────────────────

    #[test]
    fn submitted_creation_yields_one_event() {
        let owner = UserId::new();
        let (app, event) = Application::submitted(owner, &permit(), business(), ts(0)).unwrap();
        assert_eq!(app.status, ApplicationStatus::Submitted);
        assert_eq!(app.submitted_at, Some(ts(0)));
        assert_eq!(app.version, 1);
        assert_eq!(event.status, ApplicationStatus::Submitted);
        assert_eq!(event.sequence, 0);
        assert_eq!(event.updated_by, owner);
        assert!(event.comment.is_none());
        assert!(app.application_number.as_str().starts_with("APP-"));
    }

    #[test]
    fn draft_has_no_submission_time() {
        let (app, event) =
            Application::draft(UserId::new(), &permit(), business(), ts(0)).unwrap();
        assert_eq!(app.status, ApplicationStatus::Draft);
        assert!(app.submitted_at.is_none());
        assert_eq!(event.status, ApplicationStatus::Draft);
    }

    #[test]
    fn inactive_permit_rejected() {
        let mut p = permit();
        p.is_active = false;
        let err = Application::submitted(UserId::new(), &p, business(), ts(0)).unwrap_err();
        assert!(matches!(err, LifecycleError::PermitInactive(_)));
    }

    // ── Transitions ──────────────────────────────────────────────────

    #[test]
    fn review_assigns_officer() {
        let mut app = submitted(UserId::new());
        let reviewer = officer();
        let event = app
            .transition(reviewer, ApplicationStatus::UnderReview, None, ts(5))
            .unwrap();
        assert_eq!(app.assigned_officer_id, Some(reviewer.id));
        assert_eq!(event.sequence, 1);
        assert_eq!(app.version, 2);
    }

    #[test]
    fn backward_move_is_invalid() {
        let owner = UserId::new();
        let mut app = under_review(owner);
        for actor in [officer(), Actor::new(owner, Role::Citizen)] {
            let err = app
                .transition(actor, ApplicationStatus::Submitted, None, ts(20))
                .unwrap_err();
            assert_eq!(
                err,
                LifecycleError::InvalidTransition {
                    from: ApplicationStatus::UnderReview,
                    to: ApplicationStatus::Submitted,
                }
            );
        }
        assert_eq!(app.status, ApplicationStatus::UnderReview);
    }

    #[test]
    fn citizen_cannot_review() {
        let owner = UserId::new();
        let mut app = submitted(owner);
        let err = app
            .transition(
                Actor::new(owner, Role::Citizen),
                ApplicationStatus::UnderReview,
                None,
                ts(5),
            )
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Unauthorized { .. }));
    }

    #[test]
    fn system_cannot_approve() {
        let mut app = under_review(UserId::new());
        let err = app
            .transition(Actor::system(), ApplicationStatus::Approved, None, ts(20))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Unauthorized { .. }));
    }

    #[test]
    fn rejection_comment_boundary() {
        let owner = UserId::new();
        let mut app = under_review(owner);
        let err = app
            .transition(officer(), ApplicationStatus::Rejected, Some("123456789"), ts(20))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));
        assert_eq!(app.version, 2);

        let event = app
            .transition(officer(), ApplicationStatus::Rejected, Some("1234567890"), ts(20))
            .unwrap();
        assert_eq!(event.comment.as_deref(), Some("1234567890"));
        assert!(app.status.is_terminal());
    }

    #[test]
    fn rejection_comment_is_trimmed_before_measuring() {
        let mut app = under_review(UserId::new());
        let err = app
            .transition(
                officer(),
                ApplicationStatus::Rejected,
                Some("   short    "),
                ts(20),
            )
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));
        let err = app
            .transition(officer(), ApplicationStatus::Rejected, None, ts(20))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));
    }

    #[test]
    fn owner_submits_own_draft_only() {
        let owner = UserId::new();
        let (mut app, _) = Application::draft(owner, &permit(), business(), ts(0)).unwrap();
        let err = app
            .transition(
                Actor::new(UserId::new(), Role::Citizen),
                ApplicationStatus::Submitted,
                None,
                ts(1),
            )
            .unwrap_err();
        assert_eq!(err, LifecycleError::Forbidden);

        app.transition(
            Actor::new(owner, Role::Citizen),
            ApplicationStatus::Submitted,
            None,
            ts(1),
        )
        .unwrap();
        assert_eq!(app.submitted_at, Some(ts(1)));
    }

    #[test]
    fn payment_completion_by_system_owner_or_officer() {
        let owner = UserId::new();
        for actor in [Actor::system(), Actor::new(owner, Role::Citizen), officer()] {
            let mut app = submitted(owner);
            app.transition(Actor::system(), ApplicationStatus::PaymentPending, None, ts(1))
                .unwrap();
            let event = app
                .transition(actor, ApplicationStatus::Completed, None, ts(2))
                .unwrap();
            assert!(event.comment.is_none());
            assert_eq!(app.status, ApplicationStatus::Completed);
        }
    }

    #[test]
    fn stranger_cannot_complete_payment() {
        let mut app = submitted(UserId::new());
        app.transition(Actor::system(), ApplicationStatus::PaymentPending, None, ts(1))
            .unwrap();
        let err = app
            .transition(
                Actor::new(UserId::new(), Role::Citizen),
                ApplicationStatus::Completed,
                None,
                ts(2),
            )
            .unwrap_err();
        assert_eq!(err, LifecycleError::Forbidden);
    }

    #[test]
    fn clock_skew_never_reorders_history() {
        let mut app = submitted(UserId::new());
        let event = app
            .transition(officer(), ApplicationStatus::UnderReview, None, ts(-500))
            .unwrap();
        assert_eq!(event.created_at, ts(0));
        assert!(app.updated_at >= app.created_at);
    }

    #[test]
    fn full_path_to_completion() {
        let owner = UserId::new();
        let mut app = under_review(owner);
        app.transition(officer(), ApplicationStatus::Approved, None, ts(20))
            .unwrap();
        app.transition(Actor::system(), ApplicationStatus::PaymentPending, None, ts(30))
            .unwrap();
        let last = app
            .transition(Actor::system(), ApplicationStatus::Completed, None, ts(40))
            .unwrap();
        assert_eq!(last.sequence, 4);
        assert_eq!(app.version, 5);
        assert_eq!(app.user_id, owner);
    }

    #[test]
    fn application_serializes_business_fields_flat() {
        let app = submitted(UserId::new());
        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(json["business_name"], "Kangema Hardware");
        assert_eq!(json["status"], "SUBMITTED");
    }
}
