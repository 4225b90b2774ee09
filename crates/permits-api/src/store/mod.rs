//! # Persistence Layer
//!
//! The [`PermitStore`] trait is the one seam between the service and
//! storage. Two implementations:
//!
//! - [`MemoryStore`]: every table behind one `RwLock`, so each write is
//!   atomic. Used in development and tests.
//! - [`PgStore`]: Postgres via SQLx, migrations embedded. Multi-row writes
//!   run in one transaction.
//!
//! Writes that move an application carry the version they read;
//! [`StoreError::VersionConflict`] means another writer got there first.

pub mod memory;
pub mod postgres;
mod retry;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use permits_core::{ApplicationId, ApplicationNumber, PermitTypeId, Timestamp, UserId};
use permits_state::{
    Application, ApplicationStatus, Document, PermitType, PermitTypeSpec, StatusHistoryEvent,
};

use crate::model::{ApplicationFilter, Payment, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// The row changed since it was read.
    #[error("the application was modified concurrently; reload and retry")]
    VersionConflict,

    /// A unique key is already taken. Carries the key name.
    #[error("duplicate {0}")]
    Duplicate(String),

    /// Pool exhaustion or a dropped connection. Safe to retry.
    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("store failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed => {
                Self::Transient(err.to_string())
            }
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Duplicate(db.constraint().unwrap_or("key").to_string())
            }
            _ => Self::Backend(err.to_string()),
        }
    }
}

/// A new application with everything written alongside it.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub application: Application,
    pub documents: Vec<Document>,
    pub event: StatusHistoryEvent,
}

/// One status transition, written atomically.
#[derive(Debug, Clone)]
pub struct TransitionWrite {
    /// The application after the transition.
    pub application: Application,
    /// The version the transition was computed from.
    pub expected_version: i64,
    /// Documents attached by a draft submission.
    pub documents: Vec<Document>,
    pub event: StatusHistoryEvent,
    /// The payment that triggered the transition, if any.
    pub payment: Option<Payment>,
}

#[async_trait]
pub trait PermitStore: Send + Sync + std::fmt::Debug {
    /// Readiness probe.
    async fn ping(&self) -> Result<(), StoreError>;

    // ── Catalog ──────────────────────────────────────────────────────

    async fn list_permit_types(&self, active_only: bool) -> Result<Vec<PermitType>, StoreError>;

    async fn get_permit_type(&self, id: PermitTypeId) -> Result<Option<PermitType>, StoreError>;

    /// Insert or update by name, keeping the id of an existing entry.
    async fn upsert_permit_type(
        &self,
        spec: PermitTypeSpec,
        now: Timestamp,
    ) -> Result<PermitType, StoreError>;

    // ── Users ────────────────────────────────────────────────────────

    /// Fails with `Duplicate` on a taken id or email.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Display names for the given users. Unknown ids are absent.
    async fn user_names(&self, ids: &[UserId]) -> Result<HashMap<UserId, String>, StoreError>;

    // ── Applications ─────────────────────────────────────────────────

    /// Fails with `Duplicate` if the application number is taken; nothing
    /// is written in that case.
    async fn insert_application(&self, new: NewApplication) -> Result<(), StoreError>;

    async fn get_application(
        &self,
        number: &ApplicationNumber,
    ) -> Result<Option<Application>, StoreError>;

    /// Newest first.
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, StoreError>;

    async fn list_documents(&self, id: ApplicationId) -> Result<Vec<Document>, StoreError>;

    async fn list_history(&self, id: ApplicationId)
        -> Result<Vec<StatusHistoryEvent>, StoreError>;

    /// Write a transition if the stored version still equals
    /// `expected_version`.
    async fn apply_transition(&self, write: TransitionWrite) -> Result<(), StoreError>;

    /// Number of transitions into `status` recorded at or after `since`.
    async fn count_transitions_since(
        &self,
        status: ApplicationStatus,
        since: Timestamp,
    ) -> Result<i64, StoreError>;

    // ── Payments ─────────────────────────────────────────────────────

    async fn find_payment(&self, transaction_id: &str) -> Result<Option<Payment>, StoreError>;

    /// Record a payment with no transition. `Duplicate` on a known
    /// transaction id.
    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError>;
}
