//! Server wiring
//!
//! Shared state, router construction, and the serve loop.

use std::sync::Arc;
use std::time::Instant;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::core::{Result, TtsError};
use crate::server::config::ServerConfig;
use crate::server::jobs::JobManager;
use crate::server::profiles::ProfileStore;
use crate::server::routes;

/// State shared by every route handler.
pub struct ServerState {
    pub config: ServerConfig,
    pub jobs: JobManager,
    pub profiles: ProfileStore,
    started_at: Instant,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        let jobs = JobManager::new(&config.output_dir);
        let profiles = ProfileStore::open(&config.profiles_path);
        Self {
            config,
            jobs,
            profiles,
            started_at: Instant::now(),
        }
    }

    /// Seconds since the server state was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Build the full API router over shared state.
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/api/health", get(routes::health::health))
        .route("/api/engines", get(routes::engines::list))
        .route("/api/voices/:engine", get(routes::voices::list))
        .route(
            "/api/voice-profiles",
            get(routes::profiles::list).post(routes::profiles::save),
        )
        .route("/api/voice-profiles/:name", delete(routes::profiles::remove))
        .route("/api/upload", post(routes::upload::upload))
        .route("/api/convert", post(routes::convert::start))
        .route("/api/jobs/:id", get(routes::jobs::get_job))
        .route("/api/jobs/:id/files", get(routes::jobs::list_files))
        .route("/api/jobs/:id/files/:filename", get(routes::jobs::get_file))
        .route("/api/jobs/:id/download", get(routes::jobs::download))
        .route("/ws/:job_id", get(routes::ws::attach))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The conversion server: owns the state and runs the accept loop.
pub struct ConversionServer {
    state: Arc<ServerState>,
}

impl ConversionServer {
    /// Create a server, preparing its working directories.
    pub fn new(config: ServerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.output_dir).map_err(|e| TtsError::Io {
            message: format!("Failed to create output directory: {}", e),
            path: Some(config.output_dir.clone()),
        })?;
        std::fs::create_dir_all(&config.upload_dir).map_err(|e| TtsError::Io {
            message: format!("Failed to create upload directory: {}", e),
            path: Some(config.upload_dir.clone()),
        })?;
        Ok(Self {
            state: Arc::new(ServerState::new(config)),
        })
    }

    /// Shared state handle, mainly for tests.
    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Bind and serve until the process is stopped.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TtsError::Io {
                message: format!("Failed to bind {}: {}", addr, e),
                path: None,
            })?;
        info!(addr = %addr, "conversion server listening");

        let router = create_router(self.state);
        axum::serve(listener, router)
            .await
            .map_err(|e| TtsError::Io {
                message: format!("Server error: {}", e),
                path: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_construction() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            output_dir: dir.path().join("out"),
            upload_dir: dir.path().join("up"),
            profiles_path: dir.path().join("profiles.json"),
            probe_engines: false,
            ..Default::default()
        };
        let server = ConversionServer::new(config).unwrap();
        assert!(dir.path().join("out").is_dir());
        assert!(dir.path().join("up").is_dir());
        assert!(server.state().profiles.list().is_empty());
    }

    #[test]
    fn test_router_builds() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            output_dir: dir.path().join("out"),
            upload_dir: dir.path().join("up"),
            profiles_path: dir.path().join("profiles.json"),
            probe_engines: false,
            ..Default::default()
        };
        let state = Arc::new(ServerState::new(config));
        let _router = create_router(state);
    }

    #[tokio::test]
    async fn test_health_reflects_job_activity() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            output_dir: dir.path().join("out"),
            upload_dir: dir.path().join("up"),
            profiles_path: dir.path().join("profiles.json"),
            probe_engines: false,
            ..Default::default()
        };
        let state = Arc::new(ServerState::new(config));
        std::fs::create_dir_all(&state.config.output_dir).unwrap();

        let response =
            crate::server::routes::health::health(axum::extract::State(Arc::clone(&state))).await;
        assert_eq!(response.0.status, "ok");
        assert!(!response.0.active_job);

        let id = state
            .jobs
            .create_job("/books/a.txt", crate::server::types::ConversionConfig::default())
            .unwrap();
        state.jobs.set_status(&id, crate::server::types::JobStatus::Processing);

        let response = crate::server::routes::health::health(axum::extract::State(state)).await;
        assert!(response.0.active_job);
    }
}
