//! Engine registry for discovering and instantiating TTS engines
//!
//! The registry is the single map from engine names to everything needed to
//! work with them: a constructor, a dependency probe, install remediation
//! text, and descriptive metadata. The global registry is populated once on
//! first touch; additional engines can be registered at runtime.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;

use super::config::EngineConfig;
use super::traits::TtsBackend;
use crate::core::{Result, TtsError};

/// Constructor signature shared by every engine.
pub type EngineConstructor =
    Arc<dyn Fn(&str, &str, &EngineConfig) -> Result<Box<dyn TtsBackend>> + Send + Sync>;

/// Everything the registry knows about one engine.
#[derive(Clone)]
pub struct EngineEntry {
    /// Registry name, e.g. `"kokoro"`
    pub name: String,
    /// One-line description for listings
    pub description: String,
    /// Whether the engine takes reference audio instead of catalog voices
    pub requires_reference: bool,
    /// Install instructions shown when dependencies are missing
    pub remediation: String,
    /// Cheap dependency check; must never panic
    pub probe: fn() -> bool,
    /// Engine constructor taking (lang_code, device, config)
    pub constructor: EngineConstructor,
}

/// Descriptive engine metadata for listings and APIs.
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub requires_reference: bool,
}

/// Engine registry
pub struct EngineRegistry {
    entries: RwLock<HashMap<String, EngineEntry>>,
}

impl EngineRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, EngineEntry>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register an engine, replacing any previous entry with the same name.
    pub fn register(&self, entry: EngineEntry) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(entry.name.clone(), entry);
    }

    /// Names of all registered engines, sorted.
    pub fn engine_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_entries().keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether `name` is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.read_entries().contains_key(name)
    }

    /// Construct an engine instance by name.
    ///
    /// Failures always come back classified: an unknown name lists the
    /// registered names, missing dependencies carry the engine's install
    /// remediation, and any other construction failure is an
    /// initialization error preserving its cause.
    pub fn create(
        &self,
        name: &str,
        lang_code: &str,
        device: &str,
        config: &EngineConfig,
    ) -> Result<Box<dyn TtsBackend>> {
        let entry = {
            let entries = self.read_entries();
            match entries.get(name) {
                Some(entry) => entry.clone(),
                None => {
                    let mut known: Vec<String> = entries.keys().cloned().collect();
                    known.sort();
                    return Err(TtsError::UnknownEngine {
                        name: name.to_string(),
                        known: known.join(", "),
                    });
                }
            }
        };

        match (entry.constructor)(lang_code, device, config) {
            Ok(engine) => Ok(engine),
            Err(TtsError::DependencyMissing { engine, source, .. }) => {
                Err(TtsError::DependencyMissing {
                    engine,
                    remediation: remediation_for(&entry),
                    source,
                })
            }
            Err(e @ TtsError::InitializationFailed { .. }) => Err(e),
            Err(other) => Err(TtsError::initialization_failed(
                name,
                "engine construction failed",
                other,
            )),
        }
    }

    /// Names of engines whose dependencies are currently satisfied, sorted.
    ///
    /// Probes without constructing anything and never errors; an engine
    /// that fails its probe is simply absent from the result.
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .read_entries()
            .values()
            .filter(|entry| (entry.probe)())
            .map(|entry| entry.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Descriptive metadata for one engine.
    pub fn describe(&self, name: &str) -> Result<EngineInfo> {
        let entries = self.read_entries();
        let entry = entries.get(name).ok_or_else(|| {
            let mut known: Vec<String> = entries.keys().cloned().collect();
            known.sort();
            TtsError::UnknownEngine {
                name: name.to_string(),
                known: known.join(", "),
            }
        })?;
        Ok(EngineInfo {
            name: entry.name.clone(),
            display_name: display_name(&entry.name),
            description: entry.description.clone(),
            requires_reference: entry.requires_reference,
        })
    }

    /// Metadata for every registered engine, sorted by name.
    pub fn describe_all(&self) -> Vec<EngineInfo> {
        self.engine_names()
            .iter()
            .filter_map(|name| self.describe(name).ok())
            .collect()
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive a display name by title-casing the registry name.
fn display_name(name: &str) -> String {
    name.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn remediation_for(entry: &EngineEntry) -> String {
    if entry.remediation.is_empty() {
        format!("install the optional '{}' engine dependencies", entry.name)
    } else {
        entry.remediation.clone()
    }
}

/// Global engine registry, populated with the built-in engines on first use.
static REGISTRY: once_cell::sync::Lazy<EngineRegistry> = once_cell::sync::Lazy::new(|| {
    let registry = EngineRegistry::new();
    super::kokoro::register(&registry);
    super::f5_tts::register(&registry);
    registry
});

/// Get the global engine registry
pub fn global_registry() -> &'static EngineRegistry {
    &REGISTRY
}

/// Construct an engine from the global registry.
pub fn create_engine(
    name: &str,
    lang_code: &str,
    device: &str,
    config: &EngineConfig,
) -> Result<Box<dyn TtsBackend>> {
    global_registry().create(name, lang_code, device, config)
}

/// Names of all engines in the global registry, sorted.
pub fn list_engines() -> Vec<String> {
    global_registry().engine_names()
}

/// Names of global-registry engines whose dependencies are satisfied.
pub fn list_available_engines() -> Vec<String> {
    global_registry().available()
}

/// Metadata for one engine in the global registry.
pub fn describe_engine(name: &str) -> Result<EngineInfo> {
    global_registry().describe(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::traits::{SynthesisResult, SynthesisStream};

    struct NullBackend;

    impl TtsBackend for NullBackend {
        fn engine_name(&self) -> &str {
            "null"
        }

        fn sample_rate(&self) -> u32 {
            24000
        }

        fn synthesize(
            &mut self,
            _text: &str,
            _voice: &str,
            _speed: f32,
            _split_rule: Option<&str>,
        ) -> Result<SynthesisStream<'_>> {
            Ok(SynthesisStream::new(
                std::iter::empty::<Result<SynthesisResult>>(),
            ))
        }
    }

    fn null_entry(name: &str) -> EngineEntry {
        EngineEntry {
            name: name.to_string(),
            description: "test engine".to_string(),
            requires_reference: false,
            remediation: "pip install null-engine".to_string(),
            probe: || true,
            constructor: Arc::new(|_, _, _| Ok(Box::new(NullBackend))),
        }
    }

    #[test]
    fn test_global_registry_has_builtin_engines() {
        let names = list_engines();
        assert_eq!(names, vec!["f5_tts", "kokoro"]);
    }

    #[test]
    fn test_unknown_engine_lists_registered_names() {
        let err = create_engine("espeak", "en-us", "cpu", &EngineConfig::default())
            .err()
            .unwrap();
        match &err {
            TtsError::UnknownEngine { name, known } => {
                assert_eq!(name, "espeak");
                assert!(known.contains("kokoro"));
                assert!(known.contains("f5_tts"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    /// Construction either succeeds or fails with a classified error,
    /// regardless of what is installed on the machine running the tests.
    #[test]
    fn test_create_yields_classified_outcomes() {
        for name in list_engines() {
            match create_engine(&name, "en-us", "cpu", &EngineConfig::default()) {
                Ok(engine) => assert_eq!(engine.engine_name(), name),
                Err(
                    TtsError::DependencyMissing { .. } | TtsError::InitializationFailed { .. },
                ) => {}
                Err(other) => panic!("unclassified error for '{}': {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_dependency_missing_uses_table_remediation() {
        let registry = EngineRegistry::new();
        registry.register(EngineEntry {
            remediation: "pip install proper-package".to_string(),
            probe: || false,
            constructor: Arc::new(|_, _, _| {
                Err(TtsError::dependency_missing("broken", "wrong text"))
            }),
            ..null_entry("broken")
        });

        let err = registry
            .create("broken", "en-us", "cpu", &EngineConfig::default())
            .err()
            .unwrap();
        match err {
            TtsError::DependencyMissing { remediation, .. } => {
                assert_eq!(remediation, "pip install proper-package");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unclassified_errors_become_initialization_failed() {
        let registry = EngineRegistry::new();
        registry.register(EngineEntry {
            constructor: Arc::new(|_, _, _| {
                Err(TtsError::Io {
                    message: "disk on fire".to_string(),
                    path: None,
                })
            }),
            ..null_entry("flaky")
        });

        let err = registry
            .create("flaky", "en-us", "cpu", &EngineConfig::default())
            .err()
            .unwrap();
        match &err {
            TtsError::InitializationFailed { engine, .. } => assert_eq!(engine, "flaky"),
            other => panic!("unexpected error: {:?}", other),
        }
        use std::error::Error;
        assert!(err.source().unwrap().to_string().contains("disk on fire"));
    }

    #[test]
    fn test_available_is_subset_of_registered() {
        let registered = list_engines();
        for name in list_available_engines() {
            assert!(registered.contains(&name));
        }
    }

    #[test]
    fn test_available_respects_probes() {
        let registry = EngineRegistry::new();
        registry.register(EngineEntry {
            probe: || true,
            ..null_entry("present")
        });
        registry.register(EngineEntry {
            probe: || false,
            ..null_entry("absent")
        });
        assert_eq!(registry.available(), vec!["present"]);
    }

    #[test]
    fn test_describe_title_cases_names() {
        assert_eq!(describe_engine("kokoro").unwrap().display_name, "Kokoro");
        assert_eq!(describe_engine("f5_tts").unwrap().display_name, "F5 Tts");
        assert!(describe_engine("f5_tts").unwrap().requires_reference);
        assert!(!describe_engine("kokoro").unwrap().requires_reference);
    }

    #[test]
    fn test_describe_all_covers_registry_in_order() {
        let infos = global_registry().describe_all();
        let names: Vec<&str> = infos.iter().map(|info| info.name.as_str()).collect();
        assert_eq!(names, list_engines());
        for info in &infos {
            assert!(!info.description.is_empty());
        }
    }

    #[test]
    fn test_describe_unknown_engine() {
        let err = describe_engine("missing").unwrap_err();
        assert!(matches!(err, TtsError::UnknownEngine { .. }));
    }

    #[test]
    fn test_runtime_registration() {
        let registry = EngineRegistry::new();
        registry.register(null_entry("custom"));
        assert!(registry.is_registered("custom"));

        let mut engine = registry
            .create("custom", "en-us", "cpu", &EngineConfig::default())
            .unwrap();
        let stream = engine.synthesize("hi", "any", 1.0, None).unwrap();
        assert_eq!(stream.count(), 0);
    }
}
