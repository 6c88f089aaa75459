//! Engine configuration management
//!
//! Engines are constructed from a language code, a compute device selector,
//! and a flat map of engine-specific string parameters. Adapters read the
//! keys they understand and ignore the rest, so one configuration can be
//! handed to any engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Construction-time parameters for an engine instance.
///
/// `device` is passed through to the underlying model untouched; common
/// values are `"cpu"`, `"cuda"`, and `"mps"`, but no validation happens
/// here so vendor-specific selectors keep working.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// BCP-47-ish language code, e.g. `"en-us"`
    #[serde(default = "default_lang_code")]
    pub lang_code: String,
    /// Compute device selector, forwarded verbatim
    #[serde(default = "default_device")]
    pub device: String,
    /// Engine-specific settings; unknown keys are ignored
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lang_code: default_lang_code(),
            device: default_device(),
            extra: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: EngineConfig::default(),
        }
    }

    /// Raw string value for `key`, if present.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }

    /// Parse `key` as `f32`, falling back to `default` when absent or
    /// unparsable.
    pub fn get_f32(&self, key: &str, default: f32) -> f32 {
        self.parse_f32(key).unwrap_or(default)
    }

    /// Parse `key` as `f32`, `None` when absent or unparsable.
    pub fn parse_f32(&self, key: &str) -> Option<f32> {
        self.extra.get(key).and_then(|v| v.parse().ok())
    }

    /// Parse `key` as `u32`, falling back to `default`.
    pub fn get_u32(&self, key: &str, default: u32) -> u32 {
        self.extra
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Parse `key` as a boolean, falling back to `default`.
    ///
    /// Accepts `true`/`false`, `1`/`0`, `yes`/`no` case-insensitively.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.extra.get(key).map(|v| v.to_ascii_lowercase()) {
            Some(v) if v == "true" || v == "1" || v == "yes" => true,
            Some(v) if v == "false" || v == "0" || v == "no" => false,
            _ => default,
        }
    }
}

/// Engine configuration builder
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the language code
    pub fn lang_code(mut self, code: impl Into<String>) -> Self {
        self.config.lang_code = code.into();
        self
    }

    /// Set the compute device
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.config.device = device.into();
        self
    }

    /// Add an engine-specific setting
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.extra.insert(key.into(), value.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

fn default_lang_code() -> String {
    "en-us".to_string()
}

fn default_device() -> String {
    "cpu".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.lang_code, "en-us");
        assert_eq!(config.device, "cpu");
        assert!(config.extra.is_empty());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::builder()
            .lang_code("a")
            .device("cuda")
            .set("repo_id", "hexgrad/Kokoro-82M")
            .build();

        assert_eq!(config.lang_code, "a");
        assert_eq!(config.device, "cuda");
        assert_eq!(config.get_str("repo_id"), Some("hexgrad/Kokoro-82M"));
    }

    #[test]
    fn test_typed_getters() {
        let config = EngineConfig::builder()
            .set("nfe_step", "32")
            .set("target_rms", "0.1")
            .set("remove_silence", "yes")
            .set("broken", "not-a-number")
            .build();

        assert_eq!(config.get_u32("nfe_step", 16), 32);
        assert!((config.get_f32("target_rms", 0.0) - 0.1).abs() < 1e-6);
        assert!(config.get_bool("remove_silence", false));
        assert_eq!(config.get_u32("broken", 7), 7);
        assert_eq!(config.get_u32("missing", 7), 7);
        assert!(config.parse_f32("missing").is_none());
    }

    #[test]
    fn test_unknown_keys_are_inert() {
        let config = EngineConfig::builder()
            .set("some_future_option", "whatever")
            .build();
        // Nothing reads the key; construction and lookup of known keys
        // behave exactly as without it.
        assert_eq!(config.get_str("reference_audio"), None);
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_src = r#"
            lang_code = "b"
            device = "mps"

            [extra]
            reference_audio = "/voices/sample.wav"
        "#;
        let config: EngineConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.lang_code, "b");
        assert_eq!(config.device, "mps");
        assert_eq!(
            config.get_str("reference_audio"),
            Some("/voices/sample.wav")
        );
    }

    #[test]
    fn test_toml_defaults_when_omitted() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config.lang_code, "en-us");
        assert_eq!(config.device, "cpu");
    }
}
