//! Tool settings (`settings.toml` in the config directory)
//!
//! ```toml
//! jobs = 4
//!
//! [retry]
//! max_attempts = 5
//! base_delay_ms = 200
//! backoff_factor = 2.0
//! max_delay_ms = 10000
//!
//! [wait]
//! poll_interval_ms = 2000
//! max_polls = 60
//! ```

use anyhow::{Context, Result};
use lifecycle::{RetryConfig, WaitConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.toml";

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Parallel reconcile workers for `apply`
    pub jobs: usize,
    /// Retry policy for transient provider errors
    pub retry: RetrySettings,
    /// Polling while tables settle
    pub wait: WaitSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jobs: 4,
            retry: RetrySettings::default(),
            wait: WaitSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            base_delay_ms: defaults.base_delay.as_millis() as u64,
            backoff_factor: defaults.backoff_factor,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitSettings {
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

impl Default for WaitSettings {
    fn default() -> Self {
        let defaults = WaitConfig::default();
        Self {
            poll_interval_ms: defaults.poll_interval.as_millis() as u64,
            max_polls: defaults.max_polls,
        }
    }
}

impl Settings {
    /// Load `settings.toml` from `config_dir`, or defaults if it does not exist
    pub fn load(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(SETTINGS_FILE);
        if !path.exists() {
            log::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            backoff_factor: self.retry.backoff_factor,
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn wait_config(&self) -> WaitConfig {
        WaitConfig {
            poll_interval: Duration::from_millis(self.wait.poll_interval_ms),
            max_polls: self.wait.max_polls,
        }
    }
}
