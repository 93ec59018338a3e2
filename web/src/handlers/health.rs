//! Health check endpoints.

use axum::{Json, http::StatusCode};
use serde::Serialize;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Liveness probe. Returns 200 whenever the process is serving.
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Readiness probe response
#[derive(Serialize)]
pub struct ReadinessResponse {
    /// Whether the service should receive traffic
    pub ready: bool,
}

/// Readiness probe. The engine serves from memory once wired, so
/// readiness follows liveness.
pub async fn readiness_check() -> (StatusCode, Json<ReadinessResponse>) {
    (StatusCode::OK, Json(ReadinessResponse { ready: true }))
}
