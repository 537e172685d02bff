//! Acquisition backend: per-channel producer threads and bounded queues
//!
//! Each producer runs in its own OS thread and talks to the rest of the
//! application only through crossbeam channels: a bounded data queue per
//! channel and a control channel per producer.
//!
//! # Architecture
//!
//! - [`ChannelManager`] - Builds and owns queues and producers from a [`ChannelTable`]
//! - [`ChannelProducer`] - One thread per channel and direction, paced by the channel frequency
//! - [`FrameQueue`] / [`QueueReader`] - Bounded MPMC queue; full queues drop the newest frame
//! - [`FrameSource`] - Where producers get payloads from
//!
//! # Sources
//!
//! - [`SimulatedSource`] - Random, counter or constant payloads
//! - [`HardwareSource`] - Placeholder for a serial link (`0xAA` Tx, `0x55` Rx)
//!
//! # Example
//!
//! ```ignore
//! use busdata_monitor::backend::{ChannelManager, ManagerOptions};
//! use busdata_monitor::config::ChannelTable;
//! use busdata_monitor::protocol::{DirectorySource, SchemaRegistry};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(SchemaRegistry::new(DirectorySource::new("protocol")?));
//! let table = ChannelTable::load("channel_config.json")?;
//! let mut manager = ChannelManager::from_config(&table, &registry, ManagerOptions::default())?;
//!
//! manager.start_all()?;
//! let reader = manager.queue_for("CH1").unwrap();
//! for entry in reader.drain() {
//!     println!("{}", entry);
//! }
//! manager.stop_all();
//! ```
//!
//! [`ChannelTable`]: crate::config::ChannelTable

pub mod manager;
pub mod producer;
pub mod queue;
pub mod sim_source;
pub mod source;

pub use manager::{ChannelManager, ManagerOptions};
pub use producer::{
    ChannelProducer, ProducerControl, ProducerState, ProducerStats, ProducerStatsSnapshot,
    SourceFactory,
};
pub use queue::{FrameQueue, PushOutcome, QueueReader};
pub use sim_source::{HardwareSource, SimPattern, SimulatedSource, DEFAULT_FRAME_LEN};
pub use source::FrameSource;
