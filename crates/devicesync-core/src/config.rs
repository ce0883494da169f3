//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend URL, optional API token, and sync timing.
//!
//! Configuration is stored at `~/.config/devicesync/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::cache::DEFAULT_CACHE_KEY;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "devicesync";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Minimum spacing between automatic sync attempts.
pub const DEFAULT_THROTTLE_SECS: u64 = 30;

/// Age after which a failed or offline status is flagged as stale.
pub const DEFAULT_STALENESS_SECS: u64 = 60 * 60;

/// Outer guard on screen-focus events, coarser than the engine throttle.
pub const DEFAULT_FOCUS_THROTTLE_SECS: u64 = 60;

/// Timing and storage settings for one sync engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub throttle_window: Duration,
    pub staleness_bound: Duration,
    pub cache_key: String,
    /// `None` disables the focus guard; the engine throttle still applies.
    pub focus_throttle: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            throttle_window: Duration::from_secs(DEFAULT_THROTTLE_SECS),
            staleness_bound: Duration::from_secs(DEFAULT_STALENESS_SECS),
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            focus_throttle: Some(Duration::from_secs(DEFAULT_FOCUS_THROTTLE_SECS)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub throttle_secs: Option<u64>,
    pub focus_throttle_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
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

    /// Environment variables take precedence over the config file.
    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("DEVICESYNC_API_URL") {
            self.api_base_url = Some(url);
        }
        if let Ok(token) = std::env::var("DEVICESYNC_API_TOKEN") {
            self.api_token = Some(token);
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn engine_config(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            throttle_window: self
                .throttle_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.throttle_window),
            focus_throttle: match self.focus_throttle_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.focus_throttle,
            },
            ..defaults
        }
    }
}
