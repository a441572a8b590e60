//! HTTP route handlers for the forge.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use thiserror::Error;
use tower_http::{services::ServeDir, trace::TraceLayer};

use digits_common::DigitsError;

use crate::state::AppState;

mod admin;
mod artifacts;
mod health;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let files = ServeDir::new(state.forge.store().dir());

    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))

        // Artifact generation and lookup
        .route("/artifacts", post(artifacts::create_artifact))
        .route("/artifacts/{filename}", get(artifacts::get_artifact))

        // Maintenance
        .nest("/admin", admin_routes())

        // Generated PNGs
        .nest_service(&state.config.public_prefix, files)

        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Admin routes (retention, recipe inspection)
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/cleanup", post(admin::run_cleanup))
        .route("/recipes", get(admin::list_recipes))
}

/// Handler failure
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Forge(#[from] DigitsError),

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Forge(e @ (DigitsError::InvalidInput(_) | DigitsError::NotFound(_))) => {
                (status_of(e), e.to_string())
            }
            Self::Forge(e) => {
                tracing::error!(error = %e, "Request failed");
                let message = if e.is_retryable() {
                    "storage temporarily unavailable"
                } else {
                    "internal error"
                };
                (status_of(e), message.to_string())
            }
            Self::Worker(e) => {
                tracing::error!(error = %e, "Worker task failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

fn status_of(error: &DigitsError) -> StatusCode {
    StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
