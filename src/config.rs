//! Engine configuration: store retention, feature windows and logging.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Event store retention and reaping
    pub store: StoreConfig,
    /// Feature window sizes
    pub features: FeaturesConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Retention window used by reaping and as the default read window (minutes)
    pub window_minutes: u64,
    /// Minimum seconds between two reap sweeps
    pub reap_interval_secs: u64,
    /// Maximum events kept per entity; oldest are evicted first
    pub history_capacity: usize,
    /// Number of lock stripes for the entity map
    pub shards: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Window for transaction velocity (minutes)
    pub velocity_window_minutes: u64,
    /// Window for amount z-score and volatility (minutes)
    pub amount_window_minutes: u64,
    /// Window for location, time pattern and behavioral features (minutes)
    pub pattern_window_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            window_minutes: 60,
            reap_interval_secs: 300,
            history_capacity: 1000,
            shards: 16,
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            velocity_window_minutes: 60,
            amount_window_minutes: 24 * 60,
            pattern_window_minutes: 7 * 24 * 60,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config file. Missing sections take their defaults.
    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::try_load(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "invalid config; using defaults");
                Self::default()
            }
        }
    }
}
