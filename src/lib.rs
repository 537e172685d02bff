//! # busdata-monitor: Schema-driven bus frame monitor
//!
//! Monitors multi-channel serial bus traffic. Binary frames are produced per
//! channel and direction, buffered in bounded queues, and decoded on demand
//! against declarative protocol schemas.
//!
//! ## Architecture
//!
//! - **Protocol**: Schema documents, a caching [`SchemaRegistry`] and a pure bit-level decoder
//! - **Backend**: One producer thread per channel direction feeding a bounded queue
//! - **Monitor**: A poller that drains a channel queue into a bounded row window
//! - **Communication**: Crossbeam channels for data and control
//!
//! ## Configuration
//!
//! Schemas and the channel table are read from the platform data directory
//! under `busdata-monitor` unless explicit paths are given:
//!
//! - **Linux**: `~/.local/share/busdata-monitor/`
//! - **macOS**: `~/Library/Application Support/busdata-monitor/`
//! - **Windows**: `%APPDATA%\busdata-monitor\`
//!
//! ## Example
//!
//! ```ignore
//! use busdata_monitor::{
//!     backend::{ChannelManager, ManagerOptions},
//!     config::{ChannelTable, MonitorConfig},
//!     monitor::MonitorPoller,
//!     protocol::SchemaRegistry,
//! };
//! use std::sync::Arc;
//!
//! let config = MonitorConfig::default();
//! let registry = Arc::new(SchemaRegistry::from_config(&config)?);
//! let table = ChannelTable::load("channel_config.json")?;
//!
//! let mut manager = ChannelManager::from_config(&table, &registry, ManagerOptions::from(&config))?;
//! manager.start_all()?;
//!
//! let mut poller = MonitorPoller::for_channel(&manager, "CH1").unwrap();
//! poller.poll();
//! if let Some(frame) = poller.inspect(0, &registry)? {
//!     println!("{}", serde_json::to_string(&frame)?);
//! }
//! manager.stop_all();
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod monitor;
pub mod protocol;
pub mod types;

// Re-export commonly used types
pub use backend::{ChannelManager, ManagerOptions, QueueReader};
pub use config::{ChannelConfig, ChannelTable, MonitorConfig};
pub use error::{MonitorError, Result};
pub use monitor::MonitorPoller;
pub use protocol::{decode, decode_hex, DecodedFrame, DecodedValue, ProtocolSchema, SchemaRegistry};
pub use types::{Direction, QueueEntry};
