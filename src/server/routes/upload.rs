//! Upload endpoint

use std::path::Path;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::info;
use uuid::Uuid;

use crate::server::server_core::ServerState;
use crate::server::types::{ErrorResponse, UploadResponse};

const PREVIEW_CHARS: usize = 500;

/// POST /api/upload
///
/// Accepts one multipart `file` field, stores it under the upload
/// directory with a unique prefix, and returns the stored path plus a
/// preview for text documents.
pub async fn upload(State(state): State<Arc<ServerState>>, mut multipart: Multipart) -> Response {
    let field = match multipart.next_field().await {
        Ok(Some(field)) => field,
        Ok(None) => return bad_request("multipart request had no file field"),
        Err(e) => return bad_request(&format!("invalid multipart request: {}", e)),
    };

    let filename = match field.file_name() {
        Some(name) if !name.is_empty() => sanitize_filename(name),
        _ => return bad_request("uploaded file has no filename"),
    };
    let bytes = match field.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return bad_request(&format!("failed to read upload: {}", e)),
    };

    let stored = state
        .config
        .upload_dir
        .join(format!("{}_{}", Uuid::new_v4(), filename));
    if let Err(e) = tokio::fs::write(&stored, &bytes).await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("failed to store upload: {}", e),
            }),
        )
            .into_response();
    }
    info!(path = %stored.display(), size = bytes.len(), "stored upload");

    let file_type = classify(&filename);
    let (preview, char_count) = if file_type == "text" {
        let text = String::from_utf8_lossy(&bytes);
        (
            Some(text.chars().take(PREVIEW_CHARS).collect::<String>()),
            Some(text.chars().count()),
        )
    } else {
        (None, None)
    };

    Json(UploadResponse {
        path: stored.to_string_lossy().to_string(),
        filename,
        size: bytes.len() as u64,
        file_type: file_type.to_string(),
        preview,
        char_count,
    })
    .into_response()
}

/// Strip any path components and unsafe characters from a client filename.
fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' '))
        .collect();
    if cleaned.trim_matches(['.', ' ']).is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn classify(filename: &str) -> &'static str {
    match Path::new(filename)
        .extension()
        .map(|e| e.to_ascii_lowercase())
    {
        Some(ext) if ext == "txt" || ext == "md" => "text",
        Some(ext) if ext == "wav" || ext == "mp3" || ext == "flac" || ext == "ogg" => "audio",
        _ => "unknown",
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
