//! Engine discovery endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::engine::{global_registry, list_available_engines};
use crate::server::server_core::ServerState;
use crate::server::types::EnginesResponse;

/// GET /api/engines
///
/// Lists engines whose dependencies probe as present. With probing
/// disabled in the server config, the full registry comes back instead.
pub async fn list(State(state): State<Arc<ServerState>>) -> Json<EnginesResponse> {
    let engines = if state.config.probe_engines {
        // Probes may spawn interpreter processes, so keep them off the
        // async worker threads.
        let available = tokio::task::spawn_blocking(list_available_engines)
            .await
            .unwrap_or_default();
        global_registry()
            .describe_all()
            .into_iter()
            .filter(|info| available.contains(&info.name))
            .collect()
    } else {
        global_registry().describe_all()
    };
    Json(EnginesResponse { engines })
}
