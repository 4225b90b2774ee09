//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the portal.
//! Each identifier is a distinct type, so a [`UserId`] cannot be passed
//! where an [`ApplicationId`] is expected.
//!
//! UUID-based identifiers are always valid by construction. The
//! human-readable [`ApplicationNumber`] validates its shape when parsed.

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::temporal::Timestamp;

// ─── UUID Identifiers ────────────────────────────────────────────────

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_identifier!(
    /// A registered portal user (citizen, officer, admin, or the system user).
    UserId
);
uuid_identifier!(
    /// Internal identifier of a permit application.
    ApplicationId
);
uuid_identifier!(
    /// A permit catalog entry.
    PermitTypeId
);
uuid_identifier!(
    /// An attached document metadata record.
    DocumentId
);
uuid_identifier!(
    /// A status history event.
    EventId
);
uuid_identifier!(
    /// A payment record reported by the payment collaborator.
    PaymentId
);

/// UUID of the built-in system user that performs collaborator-driven
/// transitions (payment confirmation).
const SYSTEM_USER_UUID: u128 = 1;

impl UserId {
    /// The well-known system user.
    pub fn system() -> Self {
        Self(Uuid::from_u128(SYSTEM_USER_UUID))
    }

    /// Whether this is the system user.
    pub fn is_system(&self) -> bool {
        self.0.as_u128() == SYSTEM_USER_UUID
    }
}

// ─── Application Number ──────────────────────────────────────────────

const APPLICATION_NUMBER_PREFIX: &str = "APP-";

/// The public-facing identifier of an application, used in URLs
/// (`/applications/{applicationNumber}`).
///
/// Format: `APP-<epoch_ms>-<nnn>` where `nnn` is a zero-padded random
/// three-digit suffix. Assigned exactly once, when the application is
/// created.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApplicationNumber(String);

impl ApplicationNumber {
    /// Generate a fresh number for an application created at `at`.
    pub fn generate(at: Timestamp) -> Self {
        Self::generate_with(at, &mut rand::thread_rng())
    }

    /// Generate using a caller-supplied random source.
    pub fn generate_with<R: Rng + ?Sized>(at: Timestamp, rng: &mut R) -> Self {
        let suffix: u16 = rng.gen_range(0..1000);
        Self(format!(
            "{APPLICATION_NUMBER_PREFIX}{}-{suffix:03}",
            at.epoch_millis()
        ))
    }

    /// Parse and validate an application number.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidApplicationNumber(s.to_string());
        let rest = s.strip_prefix(APPLICATION_NUMBER_PREFIX).ok_or_else(invalid)?;
        let (millis, suffix) = rest.split_once('-').ok_or_else(invalid)?;
        let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(millis) || !all_digits(suffix) || suffix.len() != 3 {
            return Err(invalid());
        }
        Ok(Self(s.to_string()))
    }

    /// The number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApplicationNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ApplicationNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ApplicationNumber> for String {
    fn from(n: ApplicationNumber) -> Self {
        n.0
    }
}

impl std::str::FromStr for ApplicationNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
