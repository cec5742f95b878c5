//! Live adapter for the `SettingsStore` port backed by a YAML file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::ports::settings::SettingsStore;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// File-backed settings store.
///
/// Keys and values live in a single YAML mapping, rewritten wholesale on
/// every `set`. The file is created lazily on first write.
pub struct FileSettings {
    path: PathBuf,
    // Serializes read-modify-write of the backing file within a process.
    lock: Mutex<()>,
}

impl FileSettings {
    /// Creates a settings store backed by `<dir>/settings.yaml`.
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self { path: dir.join("settings.yaml"), lock: Mutex::new(()) }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, BoxError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| format!("Failed to read settings file: {e}"))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse settings file: {e}").into())
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        let _guard = self.lock.lock().map_err(|_| "settings lock poisoned")?;
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BoxError> {
        let _guard = self.lock.lock().map_err(|_| "settings lock poisoned")?;
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        let yaml = serde_yaml::to_string(&entries)
            .map_err(|e| format!("Failed to serialize settings: {e}"))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create settings directory: {e}"))?;
        }
        std::fs::write(&self.path, yaml).map_err(|e| format!("Failed to write settings: {e}"))?;
        Ok(())
    }
}
