//! Persistence for user preferences: one JSON blob at a fixed path, merged
//! with defaults on load, written back on every toggle.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use roadlens_protocol::SETTINGS_FILENAME;
use roadlens_protocol::Settings;
use tracing::warn;

use crate::error::SyncError;

#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(SETTINGS_FILENAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted record. Missing fields take their defaults via
    /// serde; a missing or unreadable file falls back to full defaults.
    pub fn load(&self) -> Settings {
        let body = match fs::read_to_string(&self.path) {
            Ok(body) => body,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Settings::default();
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read settings");
                return Settings::default();
            }
        };
        match serde_json::from_str(&body) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "corrupt settings; using defaults");
                Settings::default()
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SyncError> {
        let body = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, body)?;
        Ok(())
    }
}
