//! Channel producer thread
//!
//! One producer runs per channel and direction. It asks its
//! [`FrameSource`] for a frame, formats it as a [`QueueEntry`] and pushes it
//! into the channel's [`FrameQueue`] at the configured frequency.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --start--> Running <--pause/resume--> Paused
//!                    |                          |
//!                    +-------request_stop-------+--> Stopping --wait_stopped--> Idle
//! ```
//!
//! Control messages travel on a dedicated channel. The loop waits on that
//! channel between iterations, so a stop request wakes it immediately
//! regardless of the period.
//!
//! # Backpressure
//!
//! Pushes never block. When the queue is full the new frame is discarded and
//! counted in [`ProducerStats`].

use super::queue::{FrameQueue, PushOutcome};
use super::source::FrameSource;
use crate::error::{MonitorError, Result};
use crate::protocol::ProtocolSchema;
use crate::types::{Direction, Frame, QueueEntry};
use chrono::Local;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Source failures are logged on the first occurrence and then every Nth
const FAILURE_LOG_INTERVAL: u64 = 100;

/// Builds a fresh source each time a producer starts
pub type SourceFactory = Arc<dyn Fn(Direction) -> Box<dyn FrameSource> + Send + Sync>;

/// Lifecycle state of a producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ProducerState {
    /// No thread running
    #[default]
    Idle = 0,
    /// Producing frames
    Running = 1,
    /// Thread alive but producing nothing
    Paused = 2,
    /// Stop requested, thread not yet collected
    Stopping = 3,
}

impl ProducerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ProducerState::Running,
            2 => ProducerState::Paused,
            3 => ProducerState::Stopping,
            _ => ProducerState::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ProducerState::Idle)
    }

    /// Thread is alive (running or paused)
    pub fn is_active(&self) -> bool {
        matches!(self, ProducerState::Running | ProducerState::Paused)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProducerState::Idle => "Idle",
            ProducerState::Running => "Running",
            ProducerState::Paused => "Paused",
            ProducerState::Stopping => "Stopping",
        }
    }
}

/// Messages from the controller to the producer loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerControl {
    Pause,
    Resume,
    Stop,
}

/// Counters shared between a producer thread and its controller
#[derive(Debug, Default)]
pub struct ProducerStats {
    produced: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

impl ProducerStats {
    pub fn record_produced(&self) {
        self.produced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Returns the failure count including this one
    pub fn record_failure(&self) -> u64 {
        self.failed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> ProducerStatsSnapshot {
        ProducerStatsSnapshot {
            produced: self.produced.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ProducerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProducerStatsSnapshot {
    /// Frames pushed into the queue
    pub produced: u64,
    /// Frames discarded because the queue was full
    pub dropped: u64,
    /// Source reads that returned an error
    pub failed: u64,
}

impl ProducerStatsSnapshot {
    /// Share of produced frames that were dropped, as a percentage
    pub fn drop_rate(&self) -> f64 {
        let total = self.produced + self.dropped;
        if total == 0 {
            0.0
        } else {
            (self.dropped as f64 / total as f64) * 100.0
        }
    }
}

/// Controller handle for one producer thread
pub struct ChannelProducer {
    channel_id: String,
    direction: Direction,
    schema: Arc<ProtocolSchema>,
    queue: FrameQueue,
    factory: SourceFactory,
    period: Duration,
    stop_timeout: Duration,
    hex_separator: bool,
    state: Arc<AtomicU8>,
    stats: Arc<ProducerStats>,
    control: Option<Sender<ProducerControl>>,
    done: Option<Receiver<()>>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ChannelProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelProducer")
            .field("channel_id", &self.channel_id)
            .field("direction", &self.direction)
            .field("schema", &self.schema.name)
            .field("period", &self.period)
            .field("state", &self.state())
            .finish()
    }
}

impl ChannelProducer {
    /// Create an idle producer with a 1 Hz period and 1 s stop timeout
    pub fn new(
        channel_id: impl Into<String>,
        direction: Direction,
        schema: Arc<ProtocolSchema>,
        queue: FrameQueue,
        factory: SourceFactory,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            direction,
            schema,
            queue,
            factory,
            period: Duration::from_secs(1),
            stop_timeout: Duration::from_millis(crate::config::DEFAULT_STOP_TIMEOUT_MS),
            hex_separator: true,
            state: Arc::new(AtomicU8::new(ProducerState::Idle as u8)),
            stats: Arc::new(ProducerStats::default()),
            control: None,
            done: None,
            handle: None,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn with_hex_separator(mut self, separated: bool) -> Self {
        self.hex_separator = separated;
        self
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn schema(&self) -> &Arc<ProtocolSchema> {
        &self.schema
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self) -> ProducerState {
        ProducerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn stats(&self) -> ProducerStatsSnapshot {
        self.stats.snapshot()
    }

    fn transition(&self, from: ProducerState, to: ProducerState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn send(&self, msg: ProducerControl) {
        if let Some(tx) = &self.control {
            // a closed control channel means the loop already exited
            let _ = tx.try_send(msg);
        }
    }

    /// Spawn the producer thread
    ///
    /// Returns `Ok(false)` without side effects when the producer is not idle.
    pub fn start(&mut self) -> Result<bool> {
        if !self.transition(ProducerState::Idle, ProducerState::Running) {
            return Ok(false);
        }

        let (control_tx, control_rx) = bounded(256);
        let (done_tx, done_rx) = bounded(1);

        let worker = ProducerLoop {
            channel_id: self.channel_id.clone(),
            direction: self.direction,
            frame_len: self.schema.frame_length_bytes,
            period: self.period,
            hex_separator: self.hex_separator,
            queue: self.queue.clone(),
            source: (self.factory)(self.direction),
            control: control_rx,
            stats: Arc::clone(&self.stats),
            paused: false,
        };
        let source_name = worker.source.describe();

        let spawned = std::thread::Builder::new()
            .name(format!("producer-{}-{}", self.channel_id, self.direction))
            .spawn(move || {
                worker.run();
                let _ = done_tx.send(());
            });

        match spawned {
            Ok(handle) => {
                self.control = Some(control_tx);
                self.done = Some(done_rx);
                self.handle = Some(handle);
                tracing::info!(
                    channel = %self.channel_id,
                    direction = %self.direction,
                    schema = %self.schema.name,
                    source = %source_name,
                    period_ms = self.period.as_secs_f64() * 1000.0,
                    "Producer started"
                );
                Ok(true)
            }
            Err(e) => {
                self.state
                    .store(ProducerState::Idle as u8, Ordering::SeqCst);
                Err(MonitorError::Io(e))
            }
        }
    }

    /// Suspend production; no-op unless running
    pub fn pause(&self) -> bool {
        if self.transition(ProducerState::Running, ProducerState::Paused) {
            self.send(ProducerControl::Pause);
            tracing::debug!(channel = %self.channel_id, direction = %self.direction, "Producer paused");
            true
        } else {
            false
        }
    }

    /// Continue production; no-op unless paused
    pub fn resume(&self) -> bool {
        if self.transition(ProducerState::Paused, ProducerState::Running) {
            self.send(ProducerControl::Resume);
            tracing::debug!(channel = %self.channel_id, direction = %self.direction, "Producer resumed");
            true
        } else {
            false
        }
    }

    /// Signal the loop to exit without waiting for it
    ///
    /// Returns false when there is nothing to stop.
    pub fn request_stop(&self) -> bool {
        let state = self.state();
        if !state.is_active() {
            return false;
        }
        self.state
            .store(ProducerState::Stopping as u8, Ordering::SeqCst);
        self.send(ProducerControl::Stop);
        true
    }

    /// Wait until `deadline` for a stopping thread to exit, then return to idle
    ///
    /// Returns true when the thread acknowledged its exit (or none was
    /// running). On timeout the thread is detached and false is returned.
    pub fn wait_stopped(&mut self, deadline: Instant) -> bool {
        if self.state().is_idle() {
            return true;
        }

        let finished = match self.done.take() {
            Some(done) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                !matches!(done.recv_timeout(remaining), Err(RecvTimeoutError::Timeout))
            }
            None => true,
        };

        let handle = self.handle.take();
        if finished {
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    tracing::error!(
                        channel = %self.channel_id,
                        direction = %self.direction,
                        "Producer thread panicked"
                    );
                }
            }
            tracing::info!(channel = %self.channel_id, direction = %self.direction, "Producer stopped");
        } else {
            tracing::warn!(
                channel = %self.channel_id,
                direction = %self.direction,
                timeout_ms = self.stop_timeout.as_millis() as u64,
                "Producer did not stop in time, detaching thread"
            );
        }

        self.control = None;
        self.state.store(ProducerState::Idle as u8, Ordering::SeqCst);
        finished
    }

    /// Stop and wait up to the stop timeout; safe to call repeatedly
    pub fn stop(&mut self) -> bool {
        self.request_stop();
        self.wait_stopped(Instant::now() + self.stop_timeout)
    }
}

impl Drop for ChannelProducer {
    fn drop(&mut self) {
        // dropping the control sender also disconnects the loop
        self.request_stop();
    }
}

/// State owned by the producer thread
struct ProducerLoop {
    channel_id: String,
    direction: Direction,
    frame_len: usize,
    period: Duration,
    hex_separator: bool,
    queue: FrameQueue,
    source: Box<dyn FrameSource>,
    control: Receiver<ProducerControl>,
    stats: Arc<ProducerStats>,
    paused: bool,
}

impl ProducerLoop {
    fn run(mut self) {
        loop {
            if self.paused {
                match self.control.recv() {
                    Ok(msg) => {
                        if !self.handle(msg) {
                            break;
                        }
                    }
                    Err(_) => break,
                }
                continue;
            }

            let iteration_start = Instant::now();
            if let Some(entry) = self.next_entry() {
                self.push(entry);
            }

            match self.control.recv_deadline(iteration_start + self.period) {
                Ok(msg) => {
                    if !self.handle(msg) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::trace!(channel = %self.channel_id, direction = %self.direction, "Producer loop exited");
    }

    /// Apply a control message; false means exit
    fn handle(&mut self, msg: ProducerControl) -> bool {
        match msg {
            ProducerControl::Pause => self.paused = true,
            ProducerControl::Resume => self.paused = false,
            ProducerControl::Stop => return false,
        }
        true
    }

    fn next_entry(&mut self) -> Option<QueueEntry> {
        let timestamp = Local::now();
        match self.source.read_frame(self.direction, self.frame_len) {
            Ok(payload) => {
                let frame = Frame {
                    timestamp,
                    direction: self.direction,
                    payload,
                };
                Some(frame.to_entry(self.hex_separator))
            }
            Err(e) => {
                let failures = self.stats.record_failure();
                if failures == 1 || failures % FAILURE_LOG_INTERVAL == 0 {
                    tracing::warn!(
                        channel = %self.channel_id,
                        direction = %self.direction,
                        failures,
                        "Frame source read failed: {}",
                        e
                    );
                }
                None
            }
        }
    }

    fn push(&self, entry: QueueEntry) {
        match self.queue.try_push(entry) {
            PushOutcome::Queued => self.stats.record_produced(),
            PushOutcome::Full | PushOutcome::Disconnected => {
                let dropped = self.stats.record_dropped();
                tracing::trace!(
                    channel = %self.channel_id,
                    direction = %self.direction,
                    dropped,
                    "Queue full, frame dropped"
                );
            }
        }
    }
}
