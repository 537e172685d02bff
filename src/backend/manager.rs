//! Channel manager
//!
//! Owns one [`FrameQueue`] per channel and the producers feeding it: one
//! producer for a Tx or Rx channel, two for Tx/Rx. Both producers of a
//! channel share its queue, so entries of the two directions interleave in
//! push order.
//!
//! Queues outlive configuration changes: [`ChannelManager::apply_config`]
//! rebuilds producers on the existing queue so readers stay valid.

use super::producer::{ChannelProducer, ProducerState, ProducerStatsSnapshot, SourceFactory};
use super::queue::{FrameQueue, QueueReader};
use super::sim_source::{HardwareSource, SimulatedSource};
use super::source::FrameSource;
use crate::config::{ChannelConfig, ChannelTable, MonitorConfig, SourceKind};
use crate::error::Result;
use crate::protocol::SchemaRegistry;
use crate::types::Direction;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Construction options shared by every channel
#[derive(Clone)]
pub struct ManagerOptions {
    pub queue_capacity: usize,
    pub stop_timeout: Duration,
    pub source: SourceKind,
    pub hex_separator: bool,
    /// Overrides `source` when set
    pub source_factory: Option<SourceFactory>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            queue_capacity: crate::config::DEFAULT_QUEUE_CAPACITY,
            stop_timeout: Duration::from_millis(crate::config::DEFAULT_STOP_TIMEOUT_MS),
            source: SourceKind::Simulated,
            hex_separator: true,
            source_factory: None,
        }
    }
}

impl std::fmt::Debug for ManagerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerOptions")
            .field("queue_capacity", &self.queue_capacity)
            .field("stop_timeout", &self.stop_timeout)
            .field("source", &self.source)
            .field("hex_separator", &self.hex_separator)
            .field("custom_source", &self.source_factory.is_some())
            .finish()
    }
}

impl From<&MonitorConfig> for ManagerOptions {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity,
            stop_timeout: config.stop_timeout(),
            source: config.source,
            hex_separator: config.hex_separator,
            source_factory: None,
        }
    }
}

impl ManagerOptions {
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn with_source(mut self, source: SourceKind) -> Self {
        self.source = source;
        self
    }

    pub fn with_source_factory(mut self, factory: SourceFactory) -> Self {
        self.source_factory = Some(factory);
        self
    }

    fn factory_for(&self, config: &ChannelConfig) -> SourceFactory {
        if let Some(factory) = &self.source_factory {
            return Arc::clone(factory);
        }
        match self.source {
            SourceKind::Simulated => {
                Arc::new(|_| Box::new(SimulatedSource::new()) as Box<dyn FrameSource>)
            }
            SourceKind::Hardware => {
                let settings = config.settings.clone();
                Arc::new(move |_| {
                    Box::new(HardwareSource::new(settings.clone())) as Box<dyn FrameSource>
                })
            }
        }
    }
}

/// One configured channel: its config, queue and producers
struct ChannelSlot {
    config: ChannelConfig,
    queue: FrameQueue,
    producers: Vec<ChannelProducer>,
}

impl ChannelSlot {
    fn is_running(&self) -> bool {
        self.producers.iter().any(|p| p.state().is_active())
    }

    fn start(&mut self) -> Result<usize> {
        let mut started = 0;
        for producer in &mut self.producers {
            if producer.start()? {
                started += 1;
            }
        }
        Ok(started)
    }

    fn stop(&mut self, timeout: Duration) -> bool {
        for producer in &self.producers {
            producer.request_stop();
        }
        let deadline = Instant::now() + timeout;
        self.producers
            .iter_mut()
            .fold(true, |clean, p| p.wait_stopped(deadline) && clean)
    }
}

/// Builds producers for `config` without starting them
///
/// Every schema is resolved first, so an unknown schema fails before
/// anything is created.
fn build_producers(
    config: &ChannelConfig,
    queue: &FrameQueue,
    registry: &SchemaRegistry,
    options: &ManagerOptions,
) -> Result<Vec<ChannelProducer>> {
    let directions = config.direction.directions();
    let mut schemas = Vec::with_capacity(directions.len());
    for &direction in directions {
        schemas.push((direction, registry.get(config.schema_for(direction))?));
    }

    let factory = options.factory_for(config);
    Ok(schemas
        .into_iter()
        .map(|(direction, schema)| {
            ChannelProducer::new(
                config.channel_id.clone(),
                direction,
                schema,
                queue.clone(),
                Arc::clone(&factory),
            )
            .with_period(config.period())
            .with_stop_timeout(options.stop_timeout)
            .with_hex_separator(options.hex_separator)
        })
        .collect())
}

/// Owns every channel's queue and producers
pub struct ChannelManager {
    registry: Arc<SchemaRegistry>,
    options: ManagerOptions,
    channels: BTreeMap<String, ChannelSlot>,
}

impl std::fmt::Debug for ChannelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelManager")
            .field("channels", &self.channel_ids())
            .field("options", &self.options)
            .finish()
    }
}

impl ChannelManager {
    /// Create an empty manager
    pub fn new(registry: Arc<SchemaRegistry>, options: ManagerOptions) -> Self {
        Self {
            registry,
            options,
            channels: BTreeMap::new(),
        }
    }

    /// Build queues and idle producers for every channel in the table
    pub fn from_config(
        table: &ChannelTable,
        registry: &Arc<SchemaRegistry>,
        options: ManagerOptions,
    ) -> Result<Self> {
        let mut manager = Self::new(Arc::clone(registry), options);
        for config in table.iter() {
            manager.add_channel(config.clone())?;
        }
        tracing::info!(channels = manager.channels.len(), "Channel manager ready");
        Ok(manager)
    }

    fn add_channel(&mut self, config: ChannelConfig) -> Result<()> {
        config.validate()?;
        let queue = FrameQueue::new(self.options.queue_capacity);
        let producers = build_producers(&config, &queue, &self.registry, &self.options)?;
        tracing::debug!(
            channel = %config.channel_id,
            direction = config.direction.as_str(),
            freq = config.frequency_hz,
            "Channel configured"
        );
        self.channels.insert(
            config.channel_id.clone(),
            ChannelSlot {
                config,
                queue,
                producers,
            },
        );
        Ok(())
    }

    /// Start every idle producer, returning how many were started
    pub fn start_all(&mut self) -> Result<usize> {
        let mut started = 0;
        for slot in self.channels.values_mut() {
            started += slot.start()?;
        }
        tracing::info!(started, "Producers started");
        Ok(started)
    }

    /// Signal every producer, then wait for all against one shared deadline
    ///
    /// Returns false if any producer had to be detached.
    pub fn stop_all(&mut self) -> bool {
        for slot in self.channels.values() {
            for producer in &slot.producers {
                producer.request_stop();
            }
        }

        let deadline = Instant::now() + self.options.stop_timeout;
        let mut clean = true;
        for slot in self.channels.values_mut() {
            for producer in &mut slot.producers {
                clean &= producer.wait_stopped(deadline);
            }
        }
        clean
    }

    pub fn pause_all(&self) -> usize {
        self.producers().filter(|p| p.pause()).count()
    }

    pub fn resume_all(&self) -> usize {
        self.producers().filter(|p| p.resume()).count()
    }

    /// Replace one channel's configuration
    ///
    /// The new config and its schemas are checked before the running
    /// producers are touched. Unknown channel ids are added idle.
    pub fn apply_config(&mut self, config: ChannelConfig) -> Result<()> {
        config.validate()?;

        let Some(slot) = self.channels.get_mut(&config.channel_id) else {
            tracing::info!(channel = %config.channel_id, "Adding channel");
            return self.add_channel(config);
        };

        let producers = build_producers(&config, &slot.queue, &self.registry, &self.options)?;
        let was_running = slot.is_running();
        if !slot.stop(self.options.stop_timeout) {
            tracing::warn!(channel = %config.channel_id, "Old producers detached during reconfigure");
        }

        slot.config = config;
        slot.producers = producers;
        if was_running {
            slot.start()?;
        }
        tracing::info!(
            channel = %slot.config.channel_id,
            direction = slot.config.direction.as_str(),
            freq = slot.config.frequency_hz,
            restarted = was_running,
            "Channel reconfigured"
        );
        Ok(())
    }

    /// Read side of a channel's queue
    pub fn queue_for(&self, channel_id: &str) -> Option<QueueReader> {
        self.channels.get(channel_id).map(|s| s.queue.reader())
    }

    /// Channel ids in sorted order
    pub fn channel_ids(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    pub fn config_for(&self, channel_id: &str) -> Option<&ChannelConfig> {
        self.channels.get(channel_id).map(|s| &s.config)
    }

    pub fn stats_for(&self, channel_id: &str) -> Vec<(Direction, ProducerStatsSnapshot)> {
        self.channels
            .get(channel_id)
            .map(|s| s.producers.iter().map(|p| (p.direction(), p.stats())).collect())
            .unwrap_or_default()
    }

    pub fn states_for(&self, channel_id: &str) -> Vec<(Direction, ProducerState)> {
        self.channels
            .get(channel_id)
            .map(|s| s.producers.iter().map(|p| (p.direction(), p.state())).collect())
            .unwrap_or_default()
    }

    /// Schema name decoding entries of `direction` on a channel
    pub fn schema_for(&self, channel_id: &str, direction: Direction) -> Option<&str> {
        self.config_for(channel_id).map(|c| c.schema_for(direction))
    }

    pub fn is_running(&self, channel_id: &str) -> bool {
        self.channels
            .get(channel_id)
            .is_some_and(|s| s.is_running())
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    fn producers(&self) -> impl Iterator<Item = &ChannelProducer> {
        self.channels.values().flat_map(|s| s.producers.iter())
    }
}

impl Drop for ChannelManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}
