//! # permits-cli: Operator Command-Line Interface
//!
//! ## Subcommands
//!
//! - `catalog`: load and check a permit catalog, print it as JSON
//! - `seed`: upsert a permit catalog into Postgres by name
//!
//! Argument parsing lives here; storage goes through `permits-api`'s store.

pub mod catalog;
pub mod seed;
