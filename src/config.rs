use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::system::loadavg::LOAD_AVERAGE_SLOTS;
use crate::system::retry::RetryPolicy;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("interval_ms must be greater than 0")]
    ZeroInterval,
    #[error("load_averages must be between 1 and 3, got {0}")]
    LoadAveragesOutOfRange(usize),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub swap_retry: RetryPolicy,
    pub processes: ProcessesConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub interval_ms: u64,
    pub load_averages: usize,
    /// "text" or "json"
    pub output: String,
    /// "plain" or "json"
    pub log_format: String,
}

impl Config {
    /// Rejects settings the samplers cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        let load_averages = self.general.load_averages;
        if !(1..=LOAD_AVERAGE_SLOTS).contains(&load_averages) {
            return Err(ConfigError::LoadAveragesOutOfRange(load_averages));
        }
        Ok(())
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            interval_ms: 2000,
            load_averages: 3,
            output: "text".to_string(),
            log_format: "plain".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProcessesConfig {
    pub enabled: bool,
    /// Number of processes shown per cycle in text output, largest resident
    /// memory first.
    pub top: usize,
}

impl Default for ProcessesConfig {
    fn default() -> Self {
        ProcessesConfig {
            enabled: true,
            top: 5,
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sysprobe").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), error = %err, "invalid config, using defaults");
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}
