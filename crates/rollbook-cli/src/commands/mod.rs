//! CLI command implementations.

pub mod config;
pub mod health;
pub mod query;
pub mod serve;
pub mod version;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rollbook_config::RollbookConfig;
use rollbook_query::Snapshot;

/// Loads the layered configuration and applies a `--data-dir` override.
pub fn load_config(project: &Path, data_dir: Option<PathBuf>) -> Result<RollbookConfig> {
    let mut config =
        RollbookConfig::load_from_dir(project).context("Failed to load configuration")?;

    if let Some(dir) = data_dir {
        config.data.dir = dir;
        config.resolve_paths(project);
    }
    Ok(config)
}

/// Reads every table and builds a snapshot.
pub fn load_snapshot(config: &RollbookConfig) -> Result<Snapshot> {
    let (snapshot, report) = rollbook_load::load_snapshot(&config.data.files())
        .with_context(|| format!("Failed to load tables from {}", config.data.dir.display()))?;

    let missing = report.missing_files();
    if !missing.is_empty() {
        tracing::warn!(?missing, "some tables were not found and are empty");
    }
    Ok(snapshot.with_default_per_page(config.query.default_per_page))
}
