//! Portal roles.
//!
//! Ordered by privilege for the human roles: `Citizen < Officer < Admin`.
//! `System` is the non-human actor behind collaborator-driven transitions
//! (payment confirmation) and sorts above every human role.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Citizen,
    Officer,
    Admin,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Citizen => "CITIZEN",
            Self::Officer => "OFFICER",
            Self::Admin => "ADMIN",
            Self::System => "SYSTEM",
        }
    }

    /// Case-insensitive lookup, accepting `citizen` as well as `CITIZEN`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "CITIZEN" => Some(Self::Citizen),
            "OFFICER" => Some(Self::Officer),
            "ADMIN" => Some(Self::Admin),
            "SYSTEM" => Some(Self::System),
            _ => None,
        }
    }

    /// Officers and admins review applications.
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Officer | Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
