//! Application configuration management.
//!
//! Holds the default `EventSettings` applied to imported events, the data
//! directory for the file ledger and an optional log directory.
//!
//! Configuration is stored at `~/.config/dayleader/config.json`.
//! `DAYLEADER_DATA_DIR` and `DAYLEADER_LOG_DIR` override the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::EventSettings;

/// Application name used for config/data directory paths
const APP_NAME: &str = "dayleader";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DATA_DIR_ENV: &str = "DAYLEADER_DATA_DIR";
const LOG_DIR_ENV: &str = "DAYLEADER_LOG_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: EventSettings,
    pub data_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    fn apply_env(&mut self) {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = std::env::var_os(LOG_DIR_ENV).filter(|v| !v.is_empty()) {
            self.log_dir = Some(PathBuf::from(dir));
        }
    }

    /// Where event ledgers live: the configured directory, or the platform
    /// data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}
