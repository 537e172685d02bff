//! Monitor poller for one channel
//!
//! The poller drains a channel queue on the caller's thread and keeps a
//! bounded window of the most recent rows for display. Any retained row can
//! be decoded on demand with the schema configured for its direction.

use crate::backend::{ChannelManager, QueueReader};
use crate::config::{DEFAULT_MAX_ROWS, MAX_ALLOWED_ROWS};
use crate::error::Result;
use crate::protocol::{DecodedFrame, SchemaRegistry};
use crate::types::{Direction, QueueEntry};
use std::collections::VecDeque;

/// Drains one channel queue into a bounded row window
#[derive(Debug)]
pub struct MonitorPoller {
    channel_id: String,
    reader: QueueReader,
    tx_schema: String,
    rx_schema: String,
    rows: VecDeque<QueueEntry>,
    max_rows: usize,
    frame_count: u64,
    paused: bool,
}

impl MonitorPoller {
    pub fn new(
        channel_id: impl Into<String>,
        reader: QueueReader,
        tx_schema: impl Into<String>,
        rx_schema: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            reader,
            tx_schema: tx_schema.into(),
            rx_schema: rx_schema.into(),
            rows: VecDeque::with_capacity(DEFAULT_MAX_ROWS),
            max_rows: DEFAULT_MAX_ROWS,
            frame_count: 0,
            paused: false,
        }
    }

    /// Poller for a managed channel, or `None` if the channel is unknown
    pub fn for_channel(manager: &ChannelManager, channel_id: &str) -> Option<Self> {
        let reader = manager.queue_for(channel_id)?;
        let tx = manager.schema_for(channel_id, Direction::Tx)?;
        let rx = manager.schema_for(channel_id, Direction::Rx)?;
        Some(Self::new(channel_id, reader, tx, rx))
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.set_max_rows(max_rows);
        self
    }

    /// Drain everything currently queued into the window
    ///
    /// Returns the number of entries drained; 0 while paused.
    pub fn poll(&mut self) -> usize {
        if self.paused {
            return 0;
        }

        let entries = self.reader.drain();
        let drained = entries.len();
        self.rows.extend(entries);
        self.trim();
        self.frame_count += drained as u64;

        if drained > 0 {
            tracing::trace!(channel = %self.channel_id, drained, total = self.frame_count, "Polled queue");
        }
        drained
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Clear the queue and the window and zero the frame count
    pub fn reset(&mut self) {
        let discarded = self.reader.clear();
        self.rows.clear();
        self.frame_count = 0;
        tracing::debug!(channel = %self.channel_id, discarded, "Monitor reset");
    }

    /// Change the window size, clamped to `1..=MAX_ALLOWED_ROWS`
    pub fn set_max_rows(&mut self, max_rows: usize) {
        self.max_rows = max_rows.clamp(1, MAX_ALLOWED_ROWS);
        self.trim();
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// Retained rows, oldest first
    pub fn rows(&self) -> &VecDeque<QueueEntry> {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&QueueEntry> {
        self.rows.get(index)
    }

    /// Total entries drained since creation or the last reset
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn schema_for(&self, direction: Direction) -> &str {
        match direction {
            Direction::Tx => &self.tx_schema,
            Direction::Rx => &self.rx_schema,
        }
    }

    /// Decode a retained row with its direction's schema
    ///
    /// Returns `Ok(None)` when there is no row at `index`.
    pub fn inspect(&self, index: usize, registry: &SchemaRegistry) -> Result<Option<DecodedFrame>> {
        let Some(row) = self.rows.get(index) else {
            return Ok(None);
        };
        registry
            .decode_hex(self.schema_for(row.direction), &row.hex)
            .map(Some)
    }

    fn trim(&mut self) {
        while self.rows.len() > self.max_rows {
            self.rows.pop_front();
        }
    }
}
