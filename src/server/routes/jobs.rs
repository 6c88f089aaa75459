//! Job inspection and artifact endpoints

use std::path::{Component, Path};
use std::sync::Arc;

use axum::extract::{Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::server::server_core::ServerState;
use crate::server::types::{ErrorResponse, Job, JobFilesResponse};

/// GET /api/jobs/:id
pub async fn get_job(State(state): State<Arc<ServerState>>, UrlPath(id): UrlPath<String>) -> Response {
    match state.jobs.get(&id) {
        Some(job) => Json(job).into_response(),
        None => not_found(&id),
    }
}

/// GET /api/jobs/:id/files
pub async fn list_files(
    State(state): State<Arc<ServerState>>,
    UrlPath(id): UrlPath<String>,
) -> Response {
    match state.jobs.get(&id) {
        Some(job) => Json(JobFilesResponse {
            folder: job.output_folder,
            files: job.output_files,
        })
        .into_response(),
        None => not_found(&id),
    }
}

/// GET /api/jobs/:id/files/:filename
///
/// Serves one artifact from the job's output folder. The filename must be
/// a bare name; anything that would escape the folder is rejected.
pub async fn get_file(
    State(state): State<Arc<ServerState>>,
    UrlPath((id, filename)): UrlPath<(String, String)>,
) -> Response {
    let Some(job) = state.jobs.get(&id) else {
        return not_found(&id);
    };
    if !is_bare_filename(&filename) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "invalid filename".to_string(),
            }),
        )
            .into_response();
    }
    serve_file(&job, &filename).await
}

/// GET /api/jobs/:id/download
///
/// Serves the job's primary audio artifact as an attachment.
pub async fn download(
    State(state): State<Arc<ServerState>>,
    UrlPath(id): UrlPath<String>,
) -> Response {
    let Some(job) = state.jobs.get(&id) else {
        return not_found(&id);
    };
    let Some(audio) = job.output_files.iter().find(|f| f.file_type == "audio") else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "job has no audio output yet".to_string(),
            }),
        )
            .into_response();
    };
    let name = audio.name.clone();
    let mut response = serve_file(&job, &name).await;
    if response.status() == StatusCode::OK {
        if let Ok(value) = format!("attachment; filename=\"{}\"", name).parse() {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
    }
    response
}

async fn serve_file(job: &Job, filename: &str) -> Response {
    let path = Path::new(&job.output_folder).join(filename);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, content_type(filename))],
            bytes,
        )
            .into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("file '{}' not found for this job", filename),
            }),
        )
            .into_response(),
    }
}

/// A filename is bare when it resolves to exactly one normal path component.
fn is_bare_filename(filename: &str) -> bool {
    let mut components = Path::new(filename).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !filename.contains("..")
}

fn content_type(filename: &str) -> &'static str {
    match Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        Some("srt") => "application/x-subrip",
        Some("vtt") => "text/vtt",
        Some("ass") => "text/plain",
        _ => "application/octet-stream",
    }
}

fn not_found(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("no job with id '{}'", id),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_filename_check() {
        assert!(is_bare_filename("chapter.wav"));
        assert!(is_bare_filename("my book.srt"));
        assert!(!is_bare_filename("../secrets.txt"));
        assert!(!is_bare_filename("sub/dir.wav"));
        assert!(!is_bare_filename("/etc/passwd"));
        assert!(!is_bare_filename(""));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type("a.wav"), "audio/wav");
        assert_eq!(content_type("a.MP3"), "audio/mpeg");
        assert_eq!(content_type("a.srt"), "application/x-subrip");
        assert_eq!(content_type("a.bin"), "application/octet-stream");
    }
}
