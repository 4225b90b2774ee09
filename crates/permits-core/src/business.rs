//! # Business Details
//!
//! The business information a citizen supplies on the first step of an
//! application. Raw form input arrives as [`BusinessDetailsInput`] and is
//! turned into the validated [`BusinessDetails`] by
//! [`BusinessDetails::parse`], which reports every offending field in one
//! [`ValidationError::Fields`].

use serde::{Deserialize, Serialize};

use crate::error::{FieldViolation, ValidationError};

/// The fixed set of business categories accepted on an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusinessType {
    #[serde(rename = "Retail")]
    Retail,
    #[serde(rename = "Restaurant/Food Service")]
    RestaurantFoodService,
    #[serde(rename = "Manufacturing")]
    Manufacturing,
    #[serde(rename = "Professional Services")]
    ProfessionalServices,
}

impl BusinessType {
    /// All business types, in display order.
    pub const ALL: [BusinessType; 4] = [
        Self::Retail,
        Self::RestaurantFoodService,
        Self::Manufacturing,
        Self::ProfessionalServices,
    ];

    /// The stored and displayed label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retail => "Retail",
            Self::RestaurantFoodService => "Restaurant/Food Service",
            Self::Manufacturing => "Manufacturing",
            Self::ProfessionalServices => "Professional Services",
        }
    }

    /// Look up a business type by its exact label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == label)
    }
}

impl std::fmt::Display for BusinessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phone number in E.164-like form: optional `+`, a non-zero leading
/// digit, then 1 to 14 further digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('+').unwrap_or(s);
        let mut bytes = digits.bytes();
        let leading_ok = matches!(bytes.next(), Some(b'1'..=b'9'));
        let rest_len = digits.len().saturating_sub(1);
        if leading_ok && (1..=14).contains(&rest_len) && bytes.all(|b| b.is_ascii_digit()) {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| ValidationError::field("phone_number", "Invalid phone number"))
    }
}

impl From<PhoneNumber> for String {
    fn from(p: PhoneNumber) -> Self {
        p.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A national identity card number. Only non-emptiness is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NationalId(String);

impl NationalId {
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NationalId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
            .ok_or_else(|| ValidationError::field("national_id", "National ID Number is required"))
    }
}

impl From<NationalId> for String {
    fn from(n: NationalId) -> Self {
        n.0
    }
}

impl std::fmt::Display for NationalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unvalidated business form fields as submitted.
///
/// Every field defaults to empty so that a missing key is reported as a
/// field violation rather than a JSON deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessDetailsInput {
    pub business_name: String,
    pub business_type: String,
    pub phone_number: String,
    pub national_id: String,
    pub business_address: String,
}

/// Validated business details carried by an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessDetails {
    pub business_name: String,
    pub business_type: BusinessType,
    pub phone_number: PhoneNumber,
    pub national_id: NationalId,
    pub business_address: String,
}

impl BusinessDetails {
    /// Validate raw form input, collecting a violation for every bad field.
    pub fn parse(input: BusinessDetailsInput) -> Result<Self, ValidationError> {
        let mut violations = Vec::new();

        let business_name = input.business_name.trim().to_string();
        if business_name.is_empty() {
            violations.push(FieldViolation::new("business_name", "Business Name is required"));
        }

        let business_type = BusinessType::from_label(input.business_type.trim());
        if business_type.is_none() {
            violations.push(FieldViolation::new(
                "business_type",
                "Please select a valid business type",
            ));
        }

        let phone_number = PhoneNumber::parse(input.phone_number.trim());
        if phone_number.is_none() {
            violations.push(FieldViolation::new("phone_number", "Invalid phone number"));
        }

        let national_id = NationalId::parse(&input.national_id);
        if national_id.is_none() {
            violations.push(FieldViolation::new(
                "national_id",
                "National ID Number is required",
            ));
        }

        let business_address = input.business_address.trim().to_string();
        if business_address.is_empty() {
            violations.push(FieldViolation::new(
                "business_address",
                "Business Address is required",
            ));
        }

        match (business_type, phone_number, national_id) {
            (Some(business_type), Some(phone_number), Some(national_id)) if violations.is_empty() => {
                Ok(Self {
                    business_name,
                    business_type,
                    phone_number,
                    national_id,
                    business_address,
                })
            }
            _ => Err(ValidationError::Fields(violations)),
        }
    }
}
