//! Serve command - load the exports and run the HTTP API.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rollbook_server::{AppState, run_server};
use tracing::info;

use super::{load_config, load_snapshot};

pub fn run(
    project: &Path,
    bind: Option<String>,
    data_dir: Option<PathBuf>,
    no_cors: bool,
) -> Result<()> {
    let mut config = load_config(project, data_dir)?;
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }
    if no_cors {
        config.server.cors = false;
    }
    let addr = config.bind_address().context("Invalid bind address")?;

    info!(dir = %config.data.dir.display(), "loading exports");
    let snapshot = load_snapshot(&config)?;
    let state = AppState::new(snapshot, config);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(run_server(state, addr))
}
