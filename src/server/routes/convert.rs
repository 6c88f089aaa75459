//! Conversion endpoint

use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::info;

use crate::server::convert::run_conversion;
use crate::server::server_core::ServerState;
use crate::server::types::{ConvertRequest, ErrorResponse, JobStartedResponse};

/// POST /api/convert
///
/// Creates a job for the uploaded document and starts the conversion on a
/// blocking thread. The response returns immediately; progress streams
/// over the job's WebSocket.
pub async fn start(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ConvertRequest>,
) -> Response {
    if !Path::new(&request.file_path).is_file() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("input file not found: {}", request.file_path),
            }),
        )
            .into_response();
    }

    let job_id = match state.jobs.create_job(&request.file_path, request.config) {
        Ok(id) => id,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("failed to create job: {}", e),
                }),
            )
                .into_response();
        }
    };
    info!(job = %job_id, file = %request.file_path, "conversion queued");

    let worker_state = Arc::clone(&state);
    let worker_job = job_id.clone();
    tokio::task::spawn_blocking(move || run_conversion(worker_state, &worker_job));

    Json(JobStartedResponse {
        job_id,
        status: "started".to_string(),
    })
    .into_response()
}
