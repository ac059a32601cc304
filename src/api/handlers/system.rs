//! System endpoints: health check and the test-harness reset.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::error::{DispatchError, ErrorResponse};

/// Request body for `POST /api/initialize`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct InitializeRequest {
    /// Base URL of the payment gateway to use from now on.
    pub payment_server: String,
}

/// Response body for `POST /api/initialize`.
#[derive(Debug, Serialize, ToSchema)]
pub struct InitializeResponse {
    /// Implementation language reported to the harness.
    pub language: String,
}

/// `POST /api/initialize` — Reset in-process state.
///
/// Records the payment gateway URL, reloads every cache from the store,
/// and drops all queued notifications and pending acknowledgments.
///
/// # Errors
///
/// Returns [`DispatchError::Internal`] on store failures.
#[utoipa::path(
    post,
    path = "/api/initialize",
    tag = "System",
    request_body = InitializeRequest,
    responses(
        (status = 200, description = "State reset", body = InitializeResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse),
    )
)]
pub async fn initialize(
    State(state): State<AppState>,
    Json(req): Json<InitializeRequest>,
) -> Result<impl IntoResponse, DispatchError> {
    state.dispatch.initialize(&req.payment_server).await?;
    Ok(Json(InitializeResponse {
        language: "rust".to_string(),
    }))
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
