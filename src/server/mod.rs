//! Conversion job server
//!
//! REST + WebSocket server that turns uploaded documents into audio:
//! - Job lifecycle: create, track progress, fetch artifacts
//! - Live log/progress streaming per job over WebSocket
//! - Engine and voice discovery endpoints
//! - Named voice-formula profiles persisted on disk

pub mod config;
pub mod convert;
pub mod jobs;
pub mod profiles;
pub mod routes;
pub mod server_core;
pub mod types;

pub use config::ServerConfig;
pub use jobs::JobManager;
pub use profiles::ProfileStore;
pub use server_core::{create_router, ConversionServer, ServerState};
pub use types::*;
