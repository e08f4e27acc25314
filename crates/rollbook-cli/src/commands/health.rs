//! Health command - load the exports and report what was found.

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{load_config, load_snapshot};

pub fn run(project: &Path, data_dir: Option<PathBuf>) -> Result<()> {
    let config = load_config(project, data_dir)?;
    let snapshot = load_snapshot(&config)?;

    println!("{}", serde_json::to_string_pretty(&snapshot.health())?);
    Ok(())
}
