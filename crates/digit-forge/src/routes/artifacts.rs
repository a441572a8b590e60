//! Artifact generation and lookup endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use digits_common::DigitString;

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateArtifactRequest {
    /// Digit string as text
    digits: Option<String>,
    /// Digit string as a number; wins over `digits`
    number: Option<u64>,
    /// Tier label; the configured default when absent
    difficulty: Option<String>,
}

/// Artifact reference handed back to the game layer.
///
/// The digit string stays server-side.
#[derive(Debug, Serialize)]
pub struct ArtifactResponse {
    filename: String,
    url: String,
    difficulty: String,
    recipe_tier: String,
}

/// Generate a new obfuscated image
pub async fn create_artifact(
    State(state): State<AppState>,
    Json(payload): Json<CreateArtifactRequest>,
) -> Result<(StatusCode, Json<ArtifactResponse>), ApiError> {
    let digits = DigitString::resolve(payload.digits.as_deref(), payload.number)?;
    let tier = payload
        .difficulty
        .unwrap_or_else(|| state.config.default_tier.clone());

    let forge = state.forge.clone();
    let artifact =
        tokio::task::spawn_blocking(move || forge.generate_digits(&digits, &tier)).await??;

    state.maybe_cleanup();

    Ok((
        StatusCode::CREATED,
        Json(ArtifactResponse {
            url: state.artifact_url(&artifact.filename),
            filename: artifact.filename,
            difficulty: artifact.tier.to_string(),
            recipe_tier: artifact.recipe_tier.to_string(),
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct EnsureResponse {
    filename: String,
    url: String,
    regenerated: bool,
}

/// Resolve an artifact reference, regenerating the image if it was purged
pub async fn get_artifact(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<EnsureResponse>, ApiError> {
    let forge = state.forge.clone();
    let ensured = tokio::task::spawn_blocking(move || forge.ensure(&filename)).await??;

    Ok(Json(EnsureResponse {
        url: state.artifact_url(&ensured.artifact.filename),
        filename: ensured.artifact.filename,
        regenerated: ensured.regenerated,
    }))
}
