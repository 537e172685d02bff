//! Configuration module for the bus data monitor
//!
//! This module handles:
//! - Application settings ([`MonitorConfig`]): queue sizes, timeouts, paths
//! - The channel configuration table ([`ChannelTable`])
//!
//! # App Data Location
//!
//! When no explicit paths are configured, schemas and the channel table are
//! looked up in the platform data directory under `busdata-monitor`:
//!
//! - **Linux**: `~/.local/share/busdata-monitor/`
//! - **macOS**: `~/Library/Application Support/busdata-monitor/`
//! - **Windows**: `%APPDATA%\busdata-monitor\`
//!
//! # Files
//!
//! - `monitor.toml` - Application settings (JSON is accepted too)
//! - `channel_config.json` - Channel table
//! - `protocol/` - One schema document per protocol

pub mod channel;

pub use channel::{
    ChannelConfig, ChannelEntry, ChannelTable, DirectionMode, SchemaRef, SerialSettings,
    MAX_FREQUENCY_HZ,
};

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for data directories
pub const APP_ID: &str = "busdata-monitor";

/// Settings filename
pub const CONFIG_FILE: &str = "monitor.toml";

/// Channel table filename
pub const CHANNEL_CONFIG_FILE: &str = "channel_config.json";

/// Schema directory name
pub const PROTOCOL_DIR: &str = "protocol";

/// Default capacity of each channel queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Default time `stop()` waits for a producer thread
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 1_000;

/// Default poller refresh period
pub const DEFAULT_REFRESH_MS: u64 = 300;

/// Default number of rows a poller retains
pub const DEFAULT_MAX_ROWS: usize = 500;

/// Upper limit for retained poller rows
pub const MAX_ALLOWED_ROWS: usize = 200_000;

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Kind of frame source the producers use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Random frames of the schema's length
    #[default]
    Simulated,
    /// Placeholder for a hardware link (fixed patterns)
    Hardware,
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Capacity of each channel queue
    pub queue_capacity: usize,
    /// How long `stop()` waits for a producer thread, in milliseconds
    pub stop_timeout_ms: u64,
    /// Poller refresh period in milliseconds
    pub refresh_ms: u64,
    /// Rows a poller retains
    pub max_rows: usize,
    /// Directory of per-protocol schema files
    pub schema_dir: Option<PathBuf>,
    /// Single JSON file holding every schema (takes precedence over `schema_dir`)
    pub schema_bundle: Option<PathBuf>,
    /// Channel table path
    pub channel_config: Option<PathBuf>,
    /// Frame source used by producers
    pub source: SourceKind,
    /// Space-separate hex pairs in queue entries
    pub hex_separator: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
            refresh_ms: DEFAULT_REFRESH_MS,
            max_rows: DEFAULT_MAX_ROWS,
            schema_dir: None,
            schema_bundle: None,
            channel_config: None,
            source: SourceKind::Simulated,
            hex_separator: true,
        }
    }
}

impl MonitorConfig {
    /// Load settings from a `.toml` or `.json` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::Config(format!("Failed to read config {:?}: {}", path, e)))?;

        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| MonitorError::Config(format!("Failed to parse config: {}", e)))?,
            _ => toml::from_str(&content)
                .map_err(|e| MonitorError::Config(format!("Failed to parse config: {}", e)))?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load settings, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load monitor config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save settings as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MonitorError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(MonitorError::Config("queue_capacity must be > 0".to_string()));
        }
        if self.refresh_ms == 0 {
            return Err(MonitorError::Config("refresh_ms must be > 0".to_string()));
        }
        if self.max_rows == 0 || self.max_rows > MAX_ALLOWED_ROWS {
            return Err(MonitorError::Config(format!(
                "max_rows must be in 1..={}",
                MAX_ALLOWED_ROWS
            )));
        }
        Ok(())
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    /// Channel table path, falling back to the app data directory
    pub fn channel_config_path(&self) -> Option<PathBuf> {
        self.channel_config
            .clone()
            .or_else(|| app_data_dir().map(|d| d.join(CHANNEL_CONFIG_FILE)))
    }

    /// Schema directory, falling back to the app data directory
    pub fn schema_dir_path(&self) -> Option<PathBuf> {
        self.schema_dir
            .clone()
            .or_else(|| app_data_dir().map(|d| d.join(PROTOCOL_DIR)))
    }
}
