//! Configuration management commands.

use std::path::Path;

use anyhow::{Context, Result};
use rollbook_config::RollbookConfig;
use rollbook_types::TableName;

/// Show the effective configuration.
pub fn show(project: &Path, format: &str) -> Result<()> {
    let config =
        RollbookConfig::load_from_dir(project).context("Failed to load configuration")?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        "toml" => {
            println!("{}", config.to_toml()?);
        }
        "text" => {
            println!("Rollbook Configuration");
            println!("======================\n");

            println!("Data:");
            println!("  Directory: {}", config.data.dir.display());
            for table in TableName::ALL {
                println!("  {:<16} {}", format!("{table}:"), config.data.file_name(table));
            }
            println!();

            println!("Server:");
            println!("  Bind address: {}", config.server.bind_address);
            println!("  CORS: {}", config.server.cors);
            println!();

            println!("Query:");
            println!("  Default page size: {}", config.query.default_per_page);
            println!("  Sample rows: {}", config.query.sample_rows);
        }
        other => anyhow::bail!("Unknown format '{other}' (expected text, json or toml)"),
    }

    Ok(())
}
