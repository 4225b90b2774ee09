//! # permits-state: Application Lifecycle
//!
//! The internal state logic of the permits portal. Everything here is pure:
//! no I/O, no clocks read implicitly. Callers pass the current time in and
//! persist whatever comes back.
//!
//! ## Modules
//!
//! - **Catalog** (`catalog.rs`): permit types, their fees and the document
//!   categories each one requires. Ships the default county catalog.
//!
//! - **Application** (`application.rs`): the application aggregate and its
//!   status machine.
//!
//! ```text
//! DRAFT ──▶ SUBMITTED ──▶ UNDER_REVIEW ──▶ APPROVED ──▶ PAYMENT_PENDING ──▶ COMPLETED
//!               │               │                             ▲
//!               │               └──▶ REJECTED (terminal)      │
//!               └─────────────────────────────────────────────┘
//! ```
//!
//! - **Documents** (`documents.rs`): validation of an uploaded document
//!   batch against a permit type's required set.
//!
//! - **Timeline** (`timeline.rs`): projection of the status history into
//!   display entries.

pub mod application;
pub mod catalog;
pub mod documents;
pub mod timeline;

// ─── Application re-exports ─────────────────────────────────────────

pub use application::{
    Actor, Application, ApplicationStatus, LifecycleError, StatusHistoryEvent,
    MIN_REJECTION_COMMENT_CHARS,
};

// ─── Catalog re-exports ─────────────────────────────────────────────

pub use catalog::{default_catalog, PermitType, PermitTypeSpec};

// ─── Document re-exports ────────────────────────────────────────────

pub use documents::{missing_categories, validate_batch, Document, DocumentError, DocumentUpload};

// ─── Timeline re-exports ────────────────────────────────────────────

pub use timeline::{project_timeline, TimelineEntry, TimelineIcon};
