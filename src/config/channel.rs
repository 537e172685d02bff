//! Channel configuration table
//!
//! The table maps a channel id to how that channel is acquired:
//!
//! ```json
//! {
//!   "CH1": {
//!     "TorR": "Tx/Rx",
//!     "freq": 20,
//!     "protocol": {"Tx": "cmd_frame", "Rx": "status_frame"},
//!     "store": "true",
//!     "settings": {"baudrate": 115200, "bytesize": 8, "stopbits": 1, "parity": "N"}
//!   }
//! }
//! ```
//!
//! Entries are parsed loosely ([`ChannelEntry`]) and then validated into a
//! typed [`ChannelConfig`].

use crate::error::{MonitorError, Result, ResultExt};
use crate::types::Direction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Upper bound for a channel's frame rate
pub const MAX_FREQUENCY_HZ: f64 = 1_000_000.0;

/// Which directions a channel carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionMode {
    Tx,
    Rx,
    Both,
}

impl DirectionMode {
    /// Directions that need a producer, in Tx, Rx order
    pub fn directions(&self) -> &'static [Direction] {
        match self {
            DirectionMode::Tx => &[Direction::Tx],
            DirectionMode::Rx => &[Direction::Rx],
            DirectionMode::Both => &[Direction::Tx, Direction::Rx],
        }
    }

    /// Parse the `TorR` column ("Tx", "Rx", "Tx/Rx")
    pub fn parse(text: &str) -> Result<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "tx" => Ok(DirectionMode::Tx),
            "rx" => Ok(DirectionMode::Rx),
            "tx/rx" | "rx/tx" | "both" => Ok(DirectionMode::Both),
            other => Err(MonitorError::Config(format!("Invalid TorR: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectionMode::Tx => "Tx",
            DirectionMode::Rx => "Rx",
            DirectionMode::Both => "Tx/Rx",
        }
    }
}

/// Schema name(s) used to decode a channel's frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaRef {
    Single(String),
    PerDirection {
        #[serde(rename = "Tx", alias = "tx")]
        tx: String,
        #[serde(rename = "Rx", alias = "rx")]
        rx: String,
    },
}

impl SchemaRef {
    /// Schema name for one direction
    pub fn for_direction(&self, direction: Direction) -> &str {
        match (self, direction) {
            (SchemaRef::Single(name), _) => name,
            (SchemaRef::PerDirection { tx, .. }, Direction::Tx) => tx,
            (SchemaRef::PerDirection { rx, .. }, Direction::Rx) => rx,
        }
    }
}

/// Serial line settings, consumed only by hardware sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    #[serde(default = "default_baudrate")]
    pub baudrate: u32,
    #[serde(default = "default_bytesize")]
    pub bytesize: u8,
    #[serde(default = "default_stopbits")]
    pub stopbits: u8,
    #[serde(default = "default_parity")]
    pub parity: String,
}

fn default_baudrate() -> u32 {
    9600
}

fn default_bytesize() -> u8 {
    8
}

fn default_stopbits() -> u8 {
    1
}

fn default_parity() -> String {
    "N".to_string()
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baudrate: default_baudrate(),
            bytesize: default_bytesize(),
            stopbits: default_stopbits(),
            parity: default_parity(),
        }
    }
}

/// `store` as written by older tools: a bool or "true"/"false"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreFlag {
    Bool(bool),
    Text(String),
}

impl StoreFlag {
    fn resolve(&self, channel_id: &str) -> Result<bool> {
        match self {
            StoreFlag::Bool(b) => Ok(*b),
            StoreFlag::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" | "" => Ok(false),
                other => Err(MonitorError::Config(format!(
                    "Channel {}: invalid store flag '{}'",
                    channel_id, other
                ))),
            },
        }
    }
}

/// Loose on-disk shape of one channel entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEntry {
    #[serde(rename = "TorR")]
    pub tor: String,
    pub freq: f64,
    pub protocol: SchemaRef,
    #[serde(default)]
    pub store: Option<StoreFlag>,
    #[serde(default)]
    pub settings: Option<SerialSettings>,
}

/// Validated configuration of one logical channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub channel_id: String,
    pub direction: DirectionMode,
    pub frequency_hz: f64,
    pub schema_ref: SchemaRef,
    pub store: bool,
    pub settings: SerialSettings,
}

impl ChannelConfig {
    /// Build a config, validating frequency and schema names
    pub fn new(
        channel_id: impl Into<String>,
        direction: DirectionMode,
        frequency_hz: f64,
        schema_ref: SchemaRef,
    ) -> Result<Self> {
        let config = Self {
            channel_id: channel_id.into(),
            direction,
            frequency_hz,
            schema_ref,
            store: false,
            settings: SerialSettings::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check id, frequency and schema names
    pub fn validate(&self) -> Result<()> {
        if self.channel_id.trim().is_empty() {
            return Err(MonitorError::Config("Channel id must not be empty".to_string()));
        }
        let freq = self.frequency_hz;
        if !freq.is_finite() || freq <= 0.0 || freq > MAX_FREQUENCY_HZ {
            return Err(MonitorError::Config(format!(
                "Channel {}: frequency {} Hz must be in (0, {}]",
                self.channel_id, freq, MAX_FREQUENCY_HZ
            )));
        }
        let names: Vec<&str> = match &self.schema_ref {
            SchemaRef::Single(name) => vec![name],
            SchemaRef::PerDirection { tx, rx } => vec![tx, rx],
        };
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(MonitorError::Config(format!(
                "Channel {}: empty protocol name",
                self.channel_id
            )));
        }
        Ok(())
    }

    pub fn with_store(mut self, store: bool) -> Self {
        self.store = store;
        self
    }

    pub fn with_settings(mut self, settings: SerialSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Validate a loose table entry
    pub fn from_entry(channel_id: &str, entry: ChannelEntry) -> Result<Self> {
        let direction =
            DirectionMode::parse(&entry.tor).context(format!("Channel {}", channel_id))?;
        let store = match &entry.store {
            Some(flag) => flag.resolve(channel_id)?,
            None => false,
        };
        Ok(Self::new(channel_id, direction, entry.freq, entry.protocol)?
            .with_store(store)
            .with_settings(entry.settings.unwrap_or_default()))
    }

    /// Convert back into the on-disk shape
    pub fn to_entry(&self) -> ChannelEntry {
        ChannelEntry {
            tor: self.direction.as_str().to_string(),
            freq: self.frequency_hz,
            protocol: self.schema_ref.clone(),
            store: Some(StoreFlag::Bool(self.store)),
            settings: Some(self.settings.clone()),
        }
    }

    /// Schema name for one direction
    pub fn schema_for(&self, direction: Direction) -> &str {
        self.schema_ref.for_direction(direction)
    }

    /// Loop period derived from the frequency
    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.frequency_hz)
    }
}

/// Validated channel table keyed by channel id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelTable {
    channels: BTreeMap<String, ChannelConfig>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON channel table
    pub fn from_json(text: &str) -> Result<Self> {
        let entries: BTreeMap<String, ChannelEntry> = serde_json::from_str(text)
            .map_err(|e| MonitorError::Config(format!("Failed to parse channel table: {}", e)))?;

        let mut table = Self::new();
        for (id, entry) in entries {
            table.insert(ChannelConfig::from_entry(&id, entry)?);
        }
        Ok(table)
    }

    /// Load a JSON channel table from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            MonitorError::Config(format!("Failed to read channel table {:?}: {}", path, e))
        })?;
        Self::from_json(&text)
    }

    /// Save the table as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let entries: BTreeMap<&str, ChannelEntry> = self
            .channels
            .iter()
            .map(|(id, cfg)| (id.as_str(), cfg.to_entry()))
            .collect();
        let content = serde_json::to_string_pretty(&entries)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn insert(&mut self, config: ChannelConfig) -> Option<ChannelConfig> {
        self.channels.insert(config.channel_id.clone(), config)
    }

    pub fn get(&self, channel_id: &str) -> Option<&ChannelConfig> {
        self.channels.get(channel_id)
    }

    /// Channels in id order
    pub fn iter(&self) -> impl Iterator<Item = &ChannelConfig> {
        self.channels.values()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl FromIterator<ChannelConfig> for ChannelTable {
    fn from_iter<I: IntoIterator<Item = ChannelConfig>>(iter: I) -> Self {
        let mut table = Self::new();
        for config in iter {
            table.insert(config);
        }
        table
    }
}
