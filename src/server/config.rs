//! Server configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{Result, TtsError};

/// Conversion server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory job artifacts are written under
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory uploads and intermediate files land in
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Path of the voice profile store
    #[serde(default = "default_profiles_path")]
    pub profiles_path: PathBuf,

    /// Probe engine dependencies when listing engines.
    ///
    /// Disabled in tests so the endpoint returns the full registry without
    /// spawning interpreter processes.
    #[serde(default = "default_true")]
    pub probe_engines: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            output_dir: default_output_dir(),
            upload_dir: default_upload_dir(),
            profiles_path: default_profiles_path(),
            probe_engines: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| TtsError::Config {
            message: format!("Failed to read config file: {}", e),
            path: Some(path.as_ref().to_path_buf()),
        })?;
        toml::from_str(&raw).map_err(|e| TtsError::Config {
            message: format!("Failed to parse config file: {}", e),
            path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = toml::to_string_pretty(self).map_err(|e| TtsError::Config {
            message: format!("Failed to serialize config: {}", e),
            path: Some(path.as_ref().to_path_buf()),
        })?;
        std::fs::write(path.as_ref(), raw).map_err(|e| TtsError::Config {
            message: format!("Failed to write config file: {}", e),
            path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// Socket address string the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8208
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_upload_dir() -> PathBuf {
    std::env::temp_dir().join("bookvoice-uploads")
}

fn default_profiles_path() -> PathBuf {
    PathBuf::from("profiles.json")
}

fn default_true() -> bool {
    true
}
