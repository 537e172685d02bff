//! Simulated and placeholder frame sources
//!
//! These let the whole pipeline run without a serial adapter attached.
//!
//! # Patterns
//!
//! - [`SimPattern::Random`] - Uniformly random bytes (default)
//! - [`SimPattern::Counter`] - Every byte carries a counter that wraps at 255
//! - [`SimPattern::Constant`] - Fixed fill byte
//!
//! [`HardwareSource`] stands in for a real link: it emits `0xAA` fill for Tx
//! and `0x55` for Rx, sized to the schema.

use super::source::FrameSource;
use crate::config::SerialSettings;
use crate::error::Result;
use crate::types::Direction;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Length used when a schema declares no frame length
pub const DEFAULT_FRAME_LEN: usize = 8;

/// Fill byte the hardware placeholder emits for Tx frames
pub const HARDWARE_TX_FILL: u8 = 0xAA;

/// Fill byte the hardware placeholder emits for Rx frames
pub const HARDWARE_RX_FILL: u8 = 0x55;

fn effective_len(length: usize) -> usize {
    if length == 0 {
        DEFAULT_FRAME_LEN
    } else {
        length
    }
}

/// Byte pattern for simulated frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimPattern {
    #[default]
    Random,
    Counter,
    Constant(u8),
}

/// Synthesizes frames from a [`SimPattern`]
#[derive(Debug)]
pub struct SimulatedSource {
    pattern: SimPattern,
    counter: u8,
    rng: StdRng,
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSource {
    /// Random frames seeded from the OS
    pub fn new() -> Self {
        Self {
            pattern: SimPattern::Random,
            counter: 0,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic random frames
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new()
        }
    }

    pub fn with_pattern(mut self, pattern: SimPattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn pattern(&self) -> SimPattern {
        self.pattern
    }
}

impl FrameSource for SimulatedSource {
    fn read_frame(&mut self, _direction: Direction, length: usize) -> Result<Vec<u8>> {
        let len = effective_len(length);
        let frame = match self.pattern {
            SimPattern::Random => {
                let mut buf = vec![0u8; len];
                self.rng.fill_bytes(&mut buf);
                buf
            }
            SimPattern::Counter => {
                let value = self.counter;
                self.counter = self.counter.wrapping_add(1);
                vec![value; len]
            }
            SimPattern::Constant(byte) => vec![byte; len],
        };
        Ok(frame)
    }

    fn describe(&self) -> String {
        format!("simulated ({:?})", self.pattern)
    }
}

/// Placeholder for a serial link, carrying the settings a driver would open with
#[derive(Debug, Clone, Default)]
pub struct HardwareSource {
    settings: SerialSettings,
}

impl HardwareSource {
    pub fn new(settings: SerialSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }
}

impl FrameSource for HardwareSource {
    fn read_frame(&mut self, direction: Direction, length: usize) -> Result<Vec<u8>> {
        let fill = match direction {
            Direction::Tx => HARDWARE_TX_FILL,
            Direction::Rx => HARDWARE_RX_FILL,
        };
        Ok(vec![fill; effective_len(length)])
    }

    fn describe(&self) -> String {
        format!(
            "hardware {} {}{}{}",
            self.settings.baudrate, self.settings.bytesize, self.settings.parity, self.settings.stopbits
        )
    }
}
