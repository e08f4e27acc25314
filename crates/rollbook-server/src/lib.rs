//! Rollbook HTTP API - JSON endpoints over the analytics engine.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

/// Builds the router with every endpoint attached.
pub fn router(state: AppState) -> Router {
    let cors = state.config.server.cors;

    let app = Router::new()
        // Status
        .route("/health", get(routes::status::health))
        .route("/debug/sample", get(routes::status::sample))
        .route("/admin/reload", post(routes::status::reload))
        // Students
        .route("/students", get(routes::students::list))
        .route("/students/count", get(routes::students::count_by_gender))
        .route(
            "/students/by-nationality",
            get(routes::students::count_by_nationality),
        )
        // Classes
        .route("/classes", get(routes::classes::list))
        // Grades
        .route("/grades/by-gender", get(routes::grades::by_gender))
        .route("/grades/by-class", get(routes::grades::by_class))
        .route("/grades/by-semester", get(routes::grades::by_semester))
        .route("/grades/distribution", get(routes::grades::distribution))
        // Attendance
        .route("/attendance/by-month", get(routes::attendance::by_month))
        .route("/attendance/by-weekday", get(routes::attendance::by_weekday))
        .route("/attendance/by-day", get(routes::attendance::by_day))
        .route(
            "/attendance/by-semester",
            get(routes::attendance::by_semester),
        )
        // Fallback
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not found") })
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Serves the API on `addr` until Ctrl-C.
pub async fn run_server(state: AppState, addr: SocketAddr) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Rollbook API ready on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Rollbook API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
