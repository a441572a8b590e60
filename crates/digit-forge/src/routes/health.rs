//! Health check endpoints.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Basic health check (is the server running?)
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct ReadyResponse {
    status: &'static str,
    artifact_dir: bool,
}

/// Readiness check (can artifacts be written?)
pub async fn ready_check(
    State(state): State<AppState>,
) -> Result<Json<ReadyResponse>, StatusCode> {
    let dir = state.forge.store().dir();
    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => Ok(Json(ReadyResponse {
            status: "ready",
            artifact_dir: true,
        })),
        Err(e) => {
            tracing::warn!(dir = ?dir, error = %e, "Artifact directory unavailable");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
