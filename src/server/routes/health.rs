//! Health endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::server::server_core::ServerState;
use crate::server::types::HealthResponse;

/// GET /api/health
pub async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        uptime: state.uptime_secs(),
        active_job: state.jobs.has_active_job(),
    })
}
