//! Service status and maintenance endpoints.

use std::collections::BTreeMap;

use axum::{Json, extract::State};
use rollbook_load::LoadReport;
use rollbook_query::{HealthReport, TableSample};
use rollbook_types::TableName;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

/// Load time and row count per table.
///
/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.current().health())
}

/// First rows of every table.
///
/// GET /debug/sample
pub async fn sample(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<TableName, TableSample>>, ApiError> {
    let sample = state.current().sample(state.config.query.sample_rows)?;
    Ok(Json(sample))
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub status: &'static str,
    pub report: LoadReport,
}

/// Re-reads the CSV exports and swaps in a fresh snapshot.
///
/// POST /admin/reload
pub async fn reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    let report = tokio::task::spawn_blocking(move || state.reload())
        .await
        .map_err(|e| ApiError::Task(e.to_string()))??;

    tracing::info!(
        rows = report.total_rows(),
        missing = report.missing_files().len(),
        "reload requested"
    );
    Ok(Json(ReloadResponse {
        status: "reloaded",
        report,
    }))
}
