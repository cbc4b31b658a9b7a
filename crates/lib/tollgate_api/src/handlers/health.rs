//! Liveness endpoint.

use axum::Json;

use crate::models::HealthResponse;

/// `GET /health` — reports the running version.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: tollgate_core::version().into(),
    })
}
