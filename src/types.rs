//! Core data types for the bus data monitor
//!
//! This module contains the small value types that flow through the
//! acquisition pipeline.
//!
//! # Main Types
//!
//! - [`Direction`] - Transmission direction of a frame (Tx or Rx)
//! - [`Frame`] - A timestamped raw payload produced by a channel source
//! - [`QueueEntry`] - The display-ready shape pushed into channel queues
//!
//! # Hex Formatting
//!
//! Payloads travel through the queues as uppercase hex pairs, one pair per
//! byte. [`format_hex`] renders them and [`parse_hex`] accepts the same text
//! back (case-insensitive, separators ignored).

use crate::error::{MonitorError, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp format used for queue entries (`HH:MM:SS.mmm`)
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S%.3f";

/// Transmission direction of a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Sent by the local side
    Tx,
    /// Received from the bus
    Rx,
}

impl Direction {
    /// Label used in queue entries and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Tx => "Tx",
            Direction::Rx => "Rx",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tx" => Ok(Direction::Tx),
            "rx" => Ok(Direction::Rx),
            other => Err(MonitorError::Config(format!(
                "Invalid direction '{}', expected Tx or Rx",
                other
            ))),
        }
    }
}

/// A single frame captured or synthesized on a channel
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Wall-clock time the frame was produced
    pub timestamp: DateTime<Local>,
    /// Direction the frame travelled
    pub direction: Direction,
    /// Raw payload bytes in wire order
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame stamped with the current local time
    pub fn now(direction: Direction, payload: Vec<u8>) -> Self {
        Self {
            timestamp: Local::now(),
            direction,
            payload,
        }
    }

    /// Convert into the queue wire shape
    pub fn to_entry(&self, separated: bool) -> QueueEntry {
        QueueEntry {
            timestamp: self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            direction: self.direction,
            hex: format_hex(&self.payload, separated),
        }
    }
}

/// Entry pushed into a channel queue: `(timestamp, direction, hex_string)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Production time formatted as `HH:MM:SS.mmm`
    pub timestamp: String,
    /// Direction tag
    pub direction: Direction,
    /// Payload as uppercase hex pairs
    pub hex: String,
}

impl QueueEntry {
    /// Decode the hex column back into payload bytes
    pub fn payload(&self) -> Result<Vec<u8>> {
        parse_hex(&self.hex)
    }

    /// Number of payload bytes carried by this entry
    pub fn byte_len(&self) -> usize {
        self.hex.chars().filter(|c| c.is_ascii_hexdigit()).count() / 2
    }

    /// Split into the plain 3-tuple shape consumed by display layers
    pub fn into_tuple(self) -> (String, Direction, String) {
        (self.timestamp, self.direction, self.hex)
    }
}

impl fmt::Display for QueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}  {}", self.timestamp, self.direction, self.hex)
    }
}

/// Format bytes as uppercase hex pairs, optionally space-separated
pub fn format_hex(bytes: &[u8], separated: bool) -> String {
    let upper = hex::encode_upper(bytes);
    if !separated || bytes.len() < 2 {
        return upper;
    }

    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, pair) in upper.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        // encode_upper only emits ASCII
        out.push(pair[0] as char);
        out.push(pair[1] as char);
    }
    out
}

/// Parse a hex string into bytes
///
/// Accepts upper or lower case, strips whitespace and the separators
/// `:` `-` `,` `_`, and drops `0x` prefixes on individual tokens.
pub fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let mut digits = String::with_capacity(input.len());
    for token in input.split(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | ',' | '_')) {
        let token = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        digits.push_str(token);
    }

    if digits.len() % 2 != 0 {
        return Err(MonitorError::MalformedHex(format!(
            "odd number of hex digits ({})",
            digits.len()
        )));
    }

    hex::decode(&digits).map_err(|e| MonitorError::MalformedHex(e.to_string()))
}
