//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::routes::orders::{AppState, SagaDriver};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Which saga driver this server was started with; clients use it
    /// to decide between blocking on the response and polling.
    pub mode: &'static str,
}

/// GET /health — liveness plus the configured saga mode.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mode = match &state.driver {
        SagaDriver::Orchestrated(_) => "orchestrated",
        SagaDriver::Choreographed(_) => "choreographed",
    };
    Json(HealthResponse { status: "ok", mode })
}
