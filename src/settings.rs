//! Persisted Settings
//!
//! The alert threshold survives restarts. It is stored as a single
//! string-encoded integer under the `crowd_threshold` key.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::monitor::{Threshold, ThresholdError};

/// Storage for the persisted threshold
pub trait SettingsStore: Send {
    /// `None` when nothing has been saved yet
    fn load_threshold(&self) -> Result<Option<Threshold>, SettingsError>;

    fn save_threshold(&mut self, threshold: Threshold) -> Result<(), SettingsError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    crowd_threshold: Option<String>,
}

/// TOML file backed settings
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<StoredSettings>, SettingsError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        toml::from_str(&content)
            .map(Some)
            .map_err(|e| SettingsError::Parse {
                path: self.path.clone(),
                error: e.to_string(),
            })
    }

    fn io_error(&self, e: std::io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.clone(),
            error: e.to_string(),
        }
    }
}

impl SettingsStore for FileSettingsStore {
    fn load_threshold(&self) -> Result<Option<Threshold>, SettingsError> {
        let stored = match self.read()? {
            Some(stored) => stored,
            None => return Ok(None),
        };

        stored
            .crowd_threshold
            .map(|raw| raw.parse().map_err(SettingsError::Invalid))
            .transpose()
    }

    fn save_threshold(&mut self, threshold: Threshold) -> Result<(), SettingsError> {
        let stored = StoredSettings {
            crowd_threshold: Some(threshold.to_string()),
        };

        let content = toml::to_string(&stored).map_err(|e| SettingsError::Serialize(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }
        std::fs::write(&self.path, content).map_err(|e| self.io_error(e))?;

        tracing::debug!(path = ?self.path, %threshold, "Threshold saved");
        Ok(())
    }
}

/// Non-persistent settings
#[derive(Debug, Default, Clone)]
pub struct MemorySettingsStore {
    threshold: Option<Threshold>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load_threshold(&self) -> Result<Option<Threshold>, SettingsError> {
        Ok(self.threshold)
    }

    fn save_threshold(&mut self, threshold: Threshold) -> Result<(), SettingsError> {
        self.threshold = Some(threshold);
        Ok(())
    }
}

/// Load the saved threshold, falling back to `default`
pub fn initial_threshold(store: &dyn SettingsStore, default: Threshold) -> Threshold {
    match store.load_threshold() {
        Ok(Some(threshold)) => {
            tracing::info!("Loaded saved threshold: {} people", threshold);
            threshold
        }
        Ok(None) => default,
        Err(e) => {
            tracing::warn!("Ignoring saved threshold: {}", e);
            default
        }
    }
}

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to access settings file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse settings file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Failed to serialize settings: {0}")]
    Serialize(String),

    #[error("Saved threshold is invalid: {0}")]
    Invalid(#[from] ThresholdError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("settings.toml"));
        assert_eq!(store.load_threshold().unwrap(), None);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let mut store = FileSettingsStore::new(&path);
        store.save_threshold(Threshold::new(8).unwrap()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), r#"crowd_threshold = "8""#);

        let reopened = FileSettingsStore::new(&path);
        assert_eq!(reopened.load_threshold().unwrap(), Some(Threshold::new(8).unwrap()));
    }

    #[test]
    fn test_invalid_saved_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "crowd_threshold = \"-4\"\n").unwrap();

        let store = FileSettingsStore::new(&path);
        assert!(matches!(store.load_threshold(), Err(SettingsError::Invalid(_))));
        assert_eq!(initial_threshold(&store, Threshold::default()).get(), 5);
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "crowd_threshold = [").unwrap();

        let store = FileSettingsStore::new(&path);
        assert!(matches!(store.load_threshold(), Err(SettingsError::Parse { .. })));

        // Saving replaces the unreadable file
        let mut store = store;
        store.save_threshold(Threshold::new(3).unwrap()).unwrap();
        assert_eq!(store.load_threshold().unwrap().map(Threshold::get), Some(3));
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemorySettingsStore::new();
        assert_eq!(initial_threshold(&store, Threshold::default()).get(), 5);

        store.save_threshold(Threshold::new(11).unwrap()).unwrap();
        assert_eq!(initial_threshold(&store, Threshold::default()).get(), 11);
    }
}
