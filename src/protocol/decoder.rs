//! Bit-level frame decoder
//!
//! Decoding treats a payload as one big-endian bit string (bit 0 is the MSB
//! of byte 0) and slices each field out of it by absolute bit position. The
//! decoder holds no state, so one schema can be used from any number of
//! threads at once.
//!
//! # Example
//!
//! ```ignore
//! use busdata_monitor::protocol::{decode_hex, ProtocolSchema};
//!
//! let schema = ProtocolSchema::from_json("nav", &text)?;
//! let frame = decode_hex(&schema, "A0 00 37 00")?;
//! for (name, value) in frame.iter() {
//!     println!("{} = {}", name, value);
//! }
//! ```

use super::schema::{FieldKind, FieldSpec, ProtocolSchema};
use crate::error::{MonitorError, Result};
use crate::types::parse_hex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// A single decoded field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedValue {
    UInt(u64),
    Int(i64),
    Float(f64),
    Label(String),
}

impl DecodedValue {
    /// Render integers as `0x..` hex, other values unchanged
    pub fn to_hex_string(&self) -> String {
        match self {
            DecodedValue::UInt(v) => format!("{:#x}", v),
            DecodedValue::Int(v) if *v < 0 => format!("-{:#x}", v.unsigned_abs()),
            DecodedValue::Int(v) => format!("{:#x}", v),
            other => other.to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DecodedValue::UInt(v) => Some(*v as f64),
            DecodedValue::Int(v) => Some(*v as f64),
            DecodedValue::Float(v) => Some(*v),
            DecodedValue::Label(_) => None,
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::UInt(v) => write!(f, "{}", v),
            DecodedValue::Int(v) => write!(f, "{}", v),
            DecodedValue::Float(v) => write!(f, "{}", v),
            DecodedValue::Label(s) => f.write_str(s),
        }
    }
}

/// Decoded field values in schema declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedFrame {
    fields: Vec<(String, DecodedValue)>,
}

impl DecodedFrame {
    /// Get a value by field name
    pub fn get(&self, name: &str) -> Option<&DecodedValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Iterate over `(name, value)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DecodedValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Field names in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_vec(self) -> Vec<(String, DecodedValue)> {
        self.fields
    }
}

impl Serialize for DecodedFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Decode a raw payload against a schema
///
/// Any error aborts the whole call; no partial frame is returned.
pub fn decode(schema: &ProtocolSchema, payload: &[u8]) -> Result<DecodedFrame> {
    let payload_bits = payload.len() * 8;
    let limit = match schema.frame_bits() {
        0 => payload_bits,
        declared => declared.min(payload_bits),
    };

    let mut fields = Vec::with_capacity(schema.fields.len());
    for field in &schema.fields {
        let value = decode_field(field, payload, limit)?;
        fields.push((field.name.clone(), value));
    }

    Ok(DecodedFrame { fields })
}

/// Decode a hex string (case-insensitive, separators ignored)
pub fn decode_hex(schema: &ProtocolSchema, text: &str) -> Result<DecodedFrame> {
    let payload = parse_hex(text)?;
    decode(schema, &payload)
}

fn decode_field(field: &FieldSpec, payload: &[u8], limit_bits: usize) -> Result<DecodedValue> {
    let start = field.start_bit();
    let length = field.bit_length as usize;
    if start + length > limit_bits {
        return Err(MonitorError::FieldRange {
            field: field.name.clone(),
            start,
            length,
            available: limit_bits,
        });
    }

    let raw = extract_bits(payload, start, length);

    Ok(match &field.kind {
        FieldKind::UInt => DecodedValue::UInt(raw),
        FieldKind::Int => DecodedValue::Int(sign_extend(raw, length)),
        FieldKind::Fixed {
            scale,
            offset,
            signed,
        } => {
            let base = if *signed {
                sign_extend(raw, length) as f64
            } else {
                raw as f64
            };
            DecodedValue::Float(base * scale + offset)
        }
        FieldKind::Enum { map } => {
            let key = raw.to_string();
            match map.get(&key) {
                Some(label) => DecodedValue::Label(label.clone()),
                None => DecodedValue::Label(format!("UNKNOWN({})", raw)),
            }
        }
        FieldKind::Unsupported(kind) => {
            return Err(MonitorError::UnsupportedFieldKind {
                field: field.name.clone(),
                kind: kind.clone(),
            })
        }
    })
}

/// Extract `length` bits (at most 64) starting at absolute bit `start`
///
/// Callers must have checked `start + length <= bytes.len() * 8`.
pub fn extract_bits(bytes: &[u8], start: usize, length: usize) -> u64 {
    debug_assert!(length <= 64);
    let mut raw = 0u64;
    let mut bit = start;
    let end = start + length;

    while bit < end {
        let byte = bytes[bit / 8];
        let in_byte = bit % 8;
        // take as many bits as remain in this byte, up to the field end
        let take = (8 - in_byte).min(end - bit);
        let shift = 8 - in_byte - take;
        let chunk = (byte >> shift) & ((1u16 << take) - 1) as u8;
        raw = (raw << take) | chunk as u64;
        bit += take;
    }

    raw
}

/// Write the low `length` bits of `value` at absolute bit `start`
///
/// Inverse of [`extract_bits`]; bits outside the field are preserved.
pub fn insert_bits(bytes: &mut [u8], start: usize, length: usize, value: u64) {
    debug_assert!(length <= 64);
    for i in 0..length {
        let bit = start + i;
        let src = (value >> (length - 1 - i)) & 1;
        let mask = 0x80u8 >> (bit % 8);
        if src == 1 {
            bytes[bit / 8] |= mask;
        } else {
            bytes[bit / 8] &= !mask;
        }
    }
}

/// Two's-complement sign extension over exactly `length` bits
pub fn sign_extend(raw: u64, length: usize) -> i64 {
    if length == 0 || length >= 64 {
        return raw as i64;
    }
    // shift the field's sign bit into bit 63, then arithmetic shift back
    let shift = 64 - length;
    ((raw << shift) as i64) >> shift
}
