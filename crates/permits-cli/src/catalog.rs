//! # Catalog Subcommand
//!
//! Loads a permit catalog from YAML (or the built-in county catalog when no
//! file is given), checks it, and prints it as JSON.
//!
//! ## File format
//!
//! ```yaml
//! permit_types:
//!   - name: Business License
//!     description: General trading license for retail and service businesses
//!     fee: "2500.00"
//!     required_documents:
//!       - NATIONAL_ID_COPY
//!       - BUSINESS_REGISTRATION_CERTIFICATE
//! ```
//!
//! `is_active` defaults to true and `required_documents` to the four
//! business license categories.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Deserialize;

use permits_state::{default_catalog, PermitTypeSpec};

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Catalog YAML file. Defaults to the built-in county catalog.
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    permit_types: Vec<PermitTypeSpec>,
}

/// Load and check a catalog.
pub fn load_catalog(path: Option<&Path>) -> Result<Vec<PermitTypeSpec>> {
    let specs = match path {
        None => default_catalog(),
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read catalog: {}", path.display()))?;
            let file: CatalogFile = serde_yaml::from_str(&raw)
                .with_context(|| format!("failed to parse catalog: {}", path.display()))?;
            file.permit_types
        }
    };
    check_catalog(&specs)?;
    Ok(specs)
}

/// Names must be present and unique ignoring case.
fn check_catalog(specs: &[PermitTypeSpec]) -> Result<()> {
    if specs.is_empty() {
        bail!("catalog has no permit types");
    }
    let mut seen = HashSet::new();
    for spec in specs {
        let name = spec.name.trim();
        if name.is_empty() {
            bail!("permit type with an empty name");
        }
        if !seen.insert(name.to_lowercase()) {
            bail!("permit type '{name}' is listed more than once");
        }
        if spec.is_active && spec.required_documents.is_empty() {
            tracing::warn!(permit_type = name, "active permit type requires no documents");
        }
    }
    Ok(())
}

pub fn run_catalog(args: &CatalogArgs) -> Result<u8> {
    let specs = load_catalog(args.catalog.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&specs)?);
    Ok(0)
}
