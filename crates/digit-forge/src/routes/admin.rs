//! Maintenance endpoints.

use axum::{Json, extract::State};
use serde::Deserialize;

use digits_common::CleanupReport;

use super::ApiError;
use crate::obfuscate::RecipeBook;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CleanupRequest {
    /// Overrides the configured retention age
    max_age_minutes: Option<u64>,
}

/// Run a retention scan now
pub async fn run_cleanup(
    State(state): State<AppState>,
    payload: Option<Json<CleanupRequest>>,
) -> Result<Json<CleanupReport>, ApiError> {
    let Json(request) = payload.unwrap_or_default();
    let max_age = request
        .max_age_minutes
        .unwrap_or(state.config.retention.max_age_minutes);

    let forge = state.forge.clone();
    let report = tokio::task::spawn_blocking(move || forge.cleanup(max_age)).await?;
    tracing::info!(max_age_minutes = max_age, removed = report.removed, "Manual cleanup");

    Ok(Json(report))
}

/// Current recipe book
pub async fn list_recipes(State(state): State<AppState>) -> Json<RecipeBook> {
    Json(state.forge.recipes().clone())
}
