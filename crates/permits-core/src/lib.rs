//! # permits-core: Foundational Types for the Permits Portal
//!
//! Every other crate in the workspace depends on `permits-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `UserId`, `ApplicationId`,
//!    `PermitTypeId`, `DocumentId` are distinct types. The public-facing
//!    `ApplicationNumber` validates its `APP-<epoch_ms>-<nnn>` shape at
//!    construction.
//!
//! 2. **Validated business fields.** `BusinessDetails` can only be built
//!    through [`BusinessDetails::parse`], which reports every offending
//!    field at once so the submitter sees field-level messages.
//!
//! 3. **No floats for money.** [`Fee`] stores integer minor units and
//!    serializes as a decimal string.
//!
//! 4. **UTC-only timestamps** with millisecond precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `permits-*` crates.
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.

pub mod business;
pub mod document;
pub mod error;
pub mod identity;
pub mod money;
pub mod role;
pub mod temporal;

pub use business::{BusinessDetails, BusinessDetailsInput, BusinessType, NationalId, PhoneNumber};
pub use document::DocumentType;
pub use error::{FieldViolation, ValidationError};
pub use identity::{
    ApplicationId, ApplicationNumber, DocumentId, EventId, PaymentId, PermitTypeId, UserId,
};
pub use money::Fee;
pub use role::Role;
pub use temporal::Timestamp;
