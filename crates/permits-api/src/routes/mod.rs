//! # API Route Modules
//!
//! - `permits`: the permit catalog.
//! - `users`: account registration and the caller's profile.
//! - `applications`: submission, drafts, officer status changes, documents
//!   and the status timeline.
//! - `officer`: the citizen dashboard, officer review queue and stats.
//! - `payments`: fee collection and the payment collaborator's callback.

pub mod applications;
pub mod officer;
pub mod payments;
pub mod permits;
pub mod users;
