//! healthwatch -- periodic HTTP endpoint health checks.
//!
//! This crate loads a list of endpoints, probes each one once, validates
//! response bodies against optional schemas, and files the results as a
//! daily JSON report.

pub mod config;
pub mod endpoints;
pub mod probes;
pub mod report;
pub mod runner;
pub mod schema;

use anyhow::Result;

pub use crate::runner::{CheckRunner, RunOutcome};

/// Run one full health check pass with the file-backed collaborators
/// described by `config`.
pub async fn run_health_checks(config: &config::AppConfig) -> Result<RunOutcome> {
    let runner = CheckRunner::from_config(config)?;
    let outcome = runner.run().await?;
    Ok(outcome)
}
