//! Voice profile persistence
//!
//! Named voice formulas saved as a JSON map on disk, so the web client can
//! offer the user's mixes across sessions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use crate::core::{Result, TtsError};
use crate::server::types::VoiceProfile;

/// On-disk store of named voice formulas.
///
/// The file is a flat JSON object mapping profile name to formula. Writes
/// go through a temp file and rename so a crash never truncates the store.
pub struct ProfileStore {
    path: PathBuf,
    profiles: Mutex<BTreeMap<String, String>>,
}

impl ProfileStore {
    /// Open the store at `path`, reading existing profiles if present.
    ///
    /// A missing file is an empty store, not an error. A corrupt file is
    /// logged and treated as empty rather than blocking startup.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let profiles = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring corrupt profile store");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self {
            path,
            profiles: Mutex::new(profiles),
        }
    }

    /// All profiles, sorted by name.
    pub fn list(&self) -> Vec<VoiceProfile> {
        self.profiles
            .lock()
            .unwrap()
            .iter()
            .map(|(name, formula)| VoiceProfile {
                name: name.clone(),
                formula: formula.clone(),
            })
            .collect()
    }

    /// Look up one profile's formula.
    pub fn get(&self, name: &str) -> Option<String> {
        self.profiles.lock().unwrap().get(name).cloned()
    }

    /// Insert or replace a profile and persist the store.
    pub fn save(&self, name: &str, formula: &str) -> Result<()> {
        let mut profiles = self.profiles.lock().unwrap();
        profiles.insert(name.to_string(), formula.to_string());
        self.persist(&profiles)
    }

    /// Remove a profile and persist the store. Returns whether it existed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let mut profiles = self.profiles.lock().unwrap();
        let existed = profiles.remove(name).is_some();
        if existed {
            self.persist(&profiles)?;
        }
        Ok(existed)
    }

    fn persist(&self, profiles: &BTreeMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(profiles).map_err(|e| TtsError::Config {
            message: format!("Failed to serialize voice profiles: {}", e),
            path: Some(self.path.clone()),
        })?;
        let tmp = self.path.with_extension("json.tmp");
        write_and_rename(&tmp, &self.path, &raw).map_err(|e| TtsError::Config {
            message: format!("Failed to write voice profiles: {}", e),
            path: Some(self.path.clone()),
        })
    }
}

fn write_and_rename(tmp: &Path, path: &Path, contents: &str) -> std::io::Result<()> {
    std::fs::write(tmp, contents)?;
    std::fs::rename(tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::open(dir.path().join("profiles.json"));
        assert!(store.list().is_empty());
        assert!(store.get("anything").is_none());
    }

    #[test]
    fn test_save_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::open(dir.path().join("profiles.json"));

        store.save("warm", "af_heart*0.7 + af_bella*0.3").unwrap();
        assert_eq!(
            store.get("warm").as_deref(),
            Some("af_heart*0.7 + af_bella*0.3")
        );

        assert!(store.delete("warm").unwrap());
        assert!(!store.delete("warm").unwrap());
        assert!(store.get("warm").is_none());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");

        {
            let store = ProfileStore::open(&path);
            store.save("narrator", "am_michael").unwrap();
            store.save("warm", "af_heart*0.5 + af_sky*0.5").unwrap();
        }

        let store = ProfileStore::open(&path);
        let profiles = store.list();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].name, "narrator");
        assert_eq!(profiles[1].name, "warm");
        assert_eq!(store.get("narrator").as_deref(), Some("am_michael"));
    }

    #[test]
    fn test_corrupt_file_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(&path, "not json {{{").unwrap();

        let store = ProfileStore::open(&path);
        assert!(store.list().is_empty());
        // Saving recovers the file.
        store.save("fresh", "af_heart").unwrap();
        let store = ProfileStore::open(&path);
        assert_eq!(store.get("fresh").as_deref(), Some("af_heart"));
    }

    #[test]
    fn test_save_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::open(dir.path().join("profiles.json"));
        store.save("warm", "af_heart").unwrap();
        store.save("warm", "af_bella").unwrap();
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.get("warm").as_deref(), Some("af_bella"));
    }
}
