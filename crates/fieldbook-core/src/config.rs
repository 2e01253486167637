//! Application configuration.
//!
//! Stored at `<config dir>/fieldbook/config.json`. The document store lives
//! under `<data dir>/fieldbook` unless overridden by `data_dir` or the
//! `FIELDBOOK_DATA_DIR` environment variable.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::period::DEFAULT_WINDOW;
use crate::store::file::DEFAULT_STALE_MINUTES;

/// Application name used for config/data directory paths
const APP_NAME: &str = "fieldbook";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides the store directory
pub const DATA_DIR_ENV: &str = "FIELDBOOK_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub default_group: Option<String>,
    pub irregular_window: usize,
    pub stale_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_group: None,
            irregular_window: DEFAULT_WINDOW,
            stale_minutes: DEFAULT_STALE_MINUTES,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(serde_json::from_str(&contents)
                .with_context(|| format!("parsing {}", path.display()))?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory of the file store.
    pub fn data_dir(&self) -> Result<PathBuf> {
        self.resolve_data_dir(std::env::var(DATA_DIR_ENV).ok())
    }

    /// Environment value first, then the configured override, then the
    /// platform data directory.
    fn resolve_data_dir(&self, env_value: Option<String>) -> Result<PathBuf> {
        if let Some(dir) = env_value.filter(|v| !v.trim().is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Window used for irregular publishers, never below one month.
    pub fn window(&self) -> usize {
        self.irregular_window.max(1)
    }
}
