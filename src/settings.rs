use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::Result;

const SETTINGS_FILE: &str = "companion-settings.json";

/// Persisted application settings. The remembered installation path is
/// explicit state loaded on startup and passed into whatever inspects the
/// install, never read from an ambient global.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub last_install_path: Option<String>,
}

impl Settings {
    fn file_path(data_dir: &Path) -> PathBuf {
        data_dir.join(SETTINGS_FILE)
    }

    /// Load settings from `data_dir`, or defaults when no file exists yet.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = Self::file_path(data_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)?;
        let settings = serde_json::from_str(&raw)?;
        Ok(settings)
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)?;
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(Self::file_path(data_dir), raw)?;
        Ok(())
    }

    /// Forget the remembered installation and persist the cleared state.
    pub fn clear(&mut self, data_dir: &Path) -> Result<()> {
        self.last_install_path = None;
        self.save(data_dir)
    }
}
