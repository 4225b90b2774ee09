//! Document categories attached to an application.

use serde::{Deserialize, Serialize};

/// The category of a supporting document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    NationalIdCopy,
    BusinessRegistrationCertificate,
    TaxComplianceCertificate,
    LocationMapGpsCoordinates,
    Other,
}

/// The categories every business license submission must cover.
pub const BUSINESS_LICENSE_REQUIREMENTS: [DocumentType; 4] = [
    DocumentType::NationalIdCopy,
    DocumentType::BusinessRegistrationCertificate,
    DocumentType::TaxComplianceCertificate,
    DocumentType::LocationMapGpsCoordinates,
];

impl DocumentType {
    pub const ALL: [DocumentType; 5] = [
        Self::NationalIdCopy,
        Self::BusinessRegistrationCertificate,
        Self::TaxComplianceCertificate,
        Self::LocationMapGpsCoordinates,
        Self::Other,
    ];

    /// Stored form, e.g. `NATIONAL_ID_COPY`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NationalIdCopy => "NATIONAL_ID_COPY",
            Self::BusinessRegistrationCertificate => "BUSINESS_REGISTRATION_CERTIFICATE",
            Self::TaxComplianceCertificate => "TAX_COMPLIANCE_CERTIFICATE",
            Self::LocationMapGpsCoordinates => "LOCATION_MAP_GPS_COORDINATES",
            Self::Other => "OTHER",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Label shown to the submitter.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NationalIdCopy => "National ID Copy",
            Self::BusinessRegistrationCertificate => "Business Registration Certificate",
            Self::TaxComplianceCertificate => "Tax Compliance Certificate",
            Self::LocationMapGpsCoordinates => "Location Map/GPS Coordinates",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_stored_names() {
        for t in DocumentType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
            assert_eq!(DocumentType::from_name(t.as_str()), Some(t));
        }
    }

    #[test]
    fn business_license_set_excludes_other() {
        assert!(!BUSINESS_LICENSE_REQUIREMENTS.contains(&DocumentType::Other));
        assert_eq!(BUSINESS_LICENSE_REQUIREMENTS.len(), 4);
    }
}
