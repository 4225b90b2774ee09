//! Stored records owned by the API layer: portal users, payment records,
//! and the application list filter.

use serde::{Deserialize, Serialize};

use permits_core::{ApplicationId, Fee, PaymentId, PermitTypeId, Role, Timestamp, UserId};
use permits_state::ApplicationStatus;

/// Display name of the well-known system user.
pub const SYSTEM_USER_NAME: &str = "County System";

/// A portal account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub id_number: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl User {
    pub fn display_name(&self) -> String {
        match (self.first_name.trim(), self.last_name.trim()) {
            (first, "") => first.to_string(),
            ("", last) => last.to_string(),
            (first, last) => format!("{first} {last}"),
        }
    }

    /// The county system account, actor of collaborator-driven moves.
    pub fn system(now: Timestamp) -> Self {
        Self {
            id: UserId::system(),
            email: "system@county.local".into(),
            first_name: SYSTEM_USER_NAME.into(),
            last_name: String::new(),
            phone_number: None,
            id_number: None,
            role: Role::System,
            is_active: true,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Mpesa,
    Card,
    Bank,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mpesa => "MPESA",
            Self::Card => "CARD",
            Self::Bank => "BANK",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "MPESA" => Some(Self::Mpesa),
            "CARD" => Some(Self::Card),
            "BANK" => Some(Self::Bank),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SUCCESS" => Some(Self::Success),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A payment outcome reported by the payment collaborator.
///
/// `transaction_id` is unique; a repeated report is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub application_id: ApplicationId,
    pub transaction_id: String,
    pub amount: Fee,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub reported_at: Timestamp,
    pub created_at: Timestamp,
}

/// Criteria for listing applications. Results are newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub owner: Option<UserId>,
    pub status: Option<ApplicationStatus>,
    pub permit_type_id: Option<PermitTypeId>,
    /// Case-insensitive match on application number or business name.
    pub search: Option<String>,
    pub include_drafts: bool,
}

impl ApplicationFilter {
    pub fn owned_by(owner: UserId) -> Self {
        Self {
            owner: Some(owner),
            include_drafts: true,
            ..Self::default()
        }
    }

    /// Whether an application with these attributes is selected.
    pub fn matches(
        &self,
        owner: UserId,
        status: ApplicationStatus,
        permit_type_id: PermitTypeId,
        number: &str,
        business_name: &str,
    ) -> bool {
        if self.owner.is_some_and(|o| o != owner) {
            return false;
        }
        if let Some(wanted) = self.status {
            if wanted != status {
                return false;
            }
        } else if !self.include_drafts && status == ApplicationStatus::Draft {
            return false;
        }
        if self.permit_type_id.is_some_and(|p| p != permit_type_id) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                number.to_lowercase().contains(&term)
                    || business_name.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}
