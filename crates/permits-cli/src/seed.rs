//! # Seed Subcommand
//!
//! Upserts a permit catalog into Postgres. Entries are matched by name, so
//! re-running the seed updates fees, descriptions and required documents
//! in place without creating duplicates. Migrations run on connect.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use permits_api::config::DatabaseConfig;
use permits_api::store::{PermitStore, PgStore};
use permits_core::Timestamp;

use crate::catalog::load_catalog;

#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Catalog YAML file. Defaults to the built-in county catalog.
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,
}

pub fn run_seed(args: &SeedArgs) -> Result<u8> {
    let specs = load_catalog(args.catalog.as_deref())?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(async {
        let store = PgStore::connect(&DatabaseConfig {
            url: args.database_url.clone(),
            max_connections: 2,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(10),
        })
        .await
        .context("failed to connect to the database")?;

        let now = Timestamp::now();
        for spec in specs {
            let name = spec.name.clone();
            let stored = store
                .upsert_permit_type(spec, now)
                .await
                .with_context(|| format!("failed to seed permit type '{name}'"))?;
            tracing::info!(permit_type = %stored.name, id = %stored.id, "permit type seeded");
            println!(
                "  {:<28} {:>14}  {}",
                stored.name,
                stored.fee.to_display_string(),
                if stored.is_active { "active" } else { "inactive" }
            );
        }
        Ok(0)
    })
}
