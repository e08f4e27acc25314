//! Shared state for the HTTP handlers.

use std::sync::Arc;

use rollbook_config::RollbookConfig;
use rollbook_load::{LoadReport, Result as LoadResult, load_snapshot};
use rollbook_query::{Snapshot, SnapshotHandle};
use tracing::info;

/// Shared state for all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Snapshot the queries run against; swapped on reload
    pub snapshot: Arc<SnapshotHandle>,

    /// Effective configuration
    pub config: Arc<RollbookConfig>,
}

impl AppState {
    pub fn new(snapshot: Snapshot, config: RollbookConfig) -> Self {
        Self {
            snapshot: Arc::new(SnapshotHandle::new(snapshot)),
            config: Arc::new(config),
        }
    }

    /// Snapshot to run one request against.
    pub fn current(&self) -> Arc<Snapshot> {
        self.snapshot.current()
    }

    /// Re-reads every table and swaps the new snapshot in.
    ///
    /// Blocking; call from a blocking context. On error the current
    /// snapshot stays in place.
    pub fn reload(&self) -> LoadResult<LoadReport> {
        let (snapshot, report) = load_snapshot(&self.config.data.files())?;
        self.snapshot
            .replace(snapshot.with_default_per_page(self.config.query.default_per_page));
        info!(
            rows = report.total_rows(),
            malformed = report.total_malformed(),
            "snapshot reloaded"
        );
        Ok(report)
    }
}
