//! # Permit Catalog
//!
//! Reference data consumed when creating applications. Permit types are
//! written by the seed command and never mutated by user flows.
//!
//! A [`PermitTypeSpec`] is the seedable description of a catalog entry
//! (name, description, fee, required document categories). It is what the
//! seed command reads from YAML. A [`PermitType`] is the stored entry with
//! its identifier and timestamps.

use serde::{Deserialize, Serialize};

use permits_core::document::BUSINESS_LICENSE_REQUIREMENTS;
use permits_core::{DocumentType, Fee, PermitTypeId, Timestamp};

/// Seedable description of a permit type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitTypeSpec {
    pub name: String,
    pub description: String,
    pub fee: Fee,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "default_required_documents")]
    pub required_documents: Vec<DocumentType>,
}

fn default_active() -> bool {
    true
}

fn default_required_documents() -> Vec<DocumentType> {
    BUSINESS_LICENSE_REQUIREMENTS.to_vec()
}

/// A stored catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitType {
    pub id: PermitTypeId,
    pub name: String,
    pub description: String,
    pub fee: Fee,
    pub is_active: bool,
    /// Document categories an application for this permit must cover.
    pub required_documents: Vec<DocumentType>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PermitType {
    /// Materialize a spec as a new catalog entry.
    pub fn from_spec(spec: PermitTypeSpec, now: Timestamp) -> Self {
        let mut required_documents = spec.required_documents;
        required_documents.sort();
        required_documents.dedup();
        Self {
            id: PermitTypeId::new(),
            name: spec.name,
            description: spec.description,
            fee: spec.fee,
            is_active: spec.is_active,
            required_documents,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a re-seeded spec to an existing entry, keeping its identity.
    pub fn apply_spec(&mut self, spec: PermitTypeSpec, now: Timestamp) {
        let id = self.id;
        let created_at = self.created_at;
        *self = Self::from_spec(spec, now);
        self.id = id;
        self.created_at = created_at;
    }
}

/// The county's standard permit catalog.
pub fn default_catalog() -> Vec<PermitTypeSpec> {
    let entry = |name: &str, description: &str, fee: u32| PermitTypeSpec {
        name: name.to_string(),
        description: description.to_string(),
        fee: Fee::from_major_units(fee),
        is_active: true,
        required_documents: default_required_documents(),
    };
    vec![
        entry(
            "Business License",
            "License required to operate a business within Murang'a County",
            2500,
        ),
        entry(
            "Building Permit",
            "Permit required for construction and building activities",
            5000,
        ),
        entry(
            "Food Handler's License",
            "License for individuals handling food in commercial establishments",
            1000,
        ),
        entry("Liquor License", "License to sell alcoholic beverages", 10000),
        entry("Transport License", "License for public transport vehicles", 3000),
        entry(
            "Environmental Permit",
            "Environmental impact assessment and compliance certification for businesses",
            7500,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_business_license_at_2500() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 6);
        let license = catalog
            .iter()
            .find(|p| p.name == "Business License")
            .unwrap();
        assert_eq!(license.fee, Fee::from_major_units(2500));
        assert_eq!(license.required_documents.len(), 4);
    }

    #[test]
    fn catalog_names_are_unique() {
        let catalog = default_catalog();
        let mut names: Vec<&str> = catalog.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), catalog.len());
    }

    #[test]
    fn yaml_spec_defaults_optional_fields() {
        let yaml = "name: Market Stall Permit\ndescription: Daily market trading\nfee: \"150.00\"\n";
        let spec: PermitTypeSpec = serde_yaml::from_str(yaml).unwrap();
        assert!(spec.is_active);
        assert_eq!(spec.required_documents, BUSINESS_LICENSE_REQUIREMENTS.to_vec());
        assert_eq!(spec.fee.minor_units(), 15_000);
    }

    #[test]
    fn from_spec_dedups_required_documents() {
        let spec = PermitTypeSpec {
            name: "x".into(),
            description: "y".into(),
            fee: Fee::ZERO,
            is_active: true,
            required_documents: vec![
                DocumentType::NationalIdCopy,
                DocumentType::NationalIdCopy,
                DocumentType::Other,
            ],
        };
        let permit = PermitType::from_spec(spec, Timestamp::now());
        assert_eq!(
            permit.required_documents,
            vec![DocumentType::NationalIdCopy, DocumentType::Other]
        );
    }

    #[test]
    fn apply_spec_keeps_identity() {
        let t0 = Timestamp::from_epoch_millis(1_000).unwrap();
        let t1 = Timestamp::from_epoch_millis(2_000).unwrap();
        let mut permit = PermitType::from_spec(default_catalog().remove(0), t0);
        let id = permit.id;
        let mut spec = default_catalog().remove(0);
        spec.fee = Fee::from_major_units(3000);
        permit.apply_spec(spec, t1);
        assert_eq!(permit.id, id);
        assert_eq!(permit.created_at, t0);
        assert_eq!(permit.updated_at, t1);
        assert_eq!(permit.fee, Fee::from_major_units(3000));
    }
}
