//! Protocol schema model
//!
//! A [`ProtocolSchema`] describes the bit layout of one frame type. Schemas
//! are parsed from a loose serde document ([`SchemaDocument`]) and validated
//! into typed [`FieldSpec`]s before anything else sees them, so a schema that
//! exists is always well-formed.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Maximum bit length of a single field
pub const MAX_FIELD_BITS: u32 = 64;

/// How a field's raw bits are interpreted
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Unsigned integer
    UInt,
    /// Two's-complement signed integer over exactly `bit_length` bits
    Int,
    /// Fixed-point: `raw * scale + offset`
    Fixed {
        scale: f64,
        offset: f64,
        /// Sign-extend raw before scaling
        signed: bool,
    },
    /// Enumeration keyed by the raw value in decimal
    Enum { map: BTreeMap<String, String> },
    /// Type name the decoder does not implement; decoding fails on it
    Unsupported(String),
}

impl FieldKind {
    /// Type name as written in schema documents
    pub fn type_name(&self) -> &str {
        match self {
            FieldKind::UInt => "uint",
            FieldKind::Int => "int",
            FieldKind::Fixed { .. } => "fixed",
            FieldKind::Enum { .. } => "enum",
            FieldKind::Unsupported(name) => name,
        }
    }
}

/// One bit-addressed field within a frame
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub byte_offset: u32,
    pub bit_offset: u32,
    pub bit_length: u32,
    pub kind: FieldKind,
    pub description: String,
}

impl FieldSpec {
    /// Absolute start bit (`byte_offset * 8 + bit_offset`)
    pub fn start_bit(&self) -> usize {
        self.byte_offset as usize * 8 + self.bit_offset as usize
    }

    /// One past the last bit covered by this field
    pub fn end_bit(&self) -> usize {
        self.start_bit() + self.bit_length as usize
    }
}

/// Immutable description of one frame layout
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolSchema {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    /// Declared frame length in bytes; 0 means undeclared
    pub frame_length_bytes: usize,
    pub fields: Vec<FieldSpec>,
}

impl ProtocolSchema {
    /// Build and validate a schema from a parsed document
    ///
    /// `fallback_name` is used when the document omits `protocol_name`,
    /// which is the case for per-file sources keyed by file stem.
    pub fn from_document(fallback_name: &str, doc: SchemaDocument) -> Result<Self> {
        let name = doc
            .protocol_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| fallback_name.to_string());

        let fields_doc = doc.fields.ok_or_else(|| MonitorError::SchemaValidation {
            schema: name.clone(),
            field_index: None,
            message: "document has no 'fields' list".to_string(),
        })?;

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(fields_doc.len());
        for (index, raw) in fields_doc.into_iter().enumerate() {
            let field = raw.into_field(&name, index)?;
            if !seen.insert(field.name.clone()) {
                return Err(MonitorError::invalid_field(
                    &name,
                    index,
                    format!("duplicate field name '{}'", field.name),
                ));
            }
            fields.push(field);
        }

        Ok(Self {
            name,
            version: doc.version,
            description: doc.description,
            frame_length_bytes: doc.protocol_length.unwrap_or(0),
            fields,
        })
    }

    /// Parse a JSON schema document
    pub fn from_json(fallback_name: &str, text: &str) -> Result<Self> {
        let doc: SchemaDocument = serde_json::from_str(text)?;
        Self::from_document(fallback_name, doc)
    }

    /// Parse a TOML schema document
    pub fn from_toml(fallback_name: &str, text: &str) -> Result<Self> {
        let doc: SchemaDocument = toml::from_str(text)?;
        Self::from_document(fallback_name, doc)
    }

    /// Declared frame length in bits (0 when undeclared)
    pub fn frame_bits(&self) -> usize {
        self.frame_length_bytes * 8
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ==================== Schema Document ====================

/// Loose, on-disk shape of a schema document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub protocol_name: Option<String>,
    #[serde(default, alias = "length")]
    pub protocol_length: Option<usize>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, alias = "desc")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<FieldDocument>>,
}

/// Loose shape of one field entry
///
/// Required attributes are optional here so that a missing one can be
/// reported with the field index instead of a generic serde error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub byte_offset: Option<u32>,
    #[serde(default)]
    pub bit_offset: Option<u32>,
    #[serde(default)]
    pub bit_length: Option<u32>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub scale: Option<f64>,
    #[serde(default)]
    pub offset: Option<f64>,
    #[serde(default)]
    pub signed: Option<bool>,
    #[serde(default, alias = "values")]
    pub map: Option<EnumMapDocument>,
}

/// Enum label map: `"0:Idle,1:Active"` or `{"0": "Idle", "1": "Active"}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumMapDocument {
    Pairs(String),
    Table(BTreeMap<String, String>),
}

impl EnumMapDocument {
    fn into_map(self, schema: &str, index: usize) -> Result<BTreeMap<String, String>> {
        match self {
            EnumMapDocument::Table(table) => Ok(table
                .into_iter()
                .map(|(k, v)| (k.trim().to_string(), v))
                .collect()),
            EnumMapDocument::Pairs(text) => {
                let mut map = BTreeMap::new();
                for item in text.split(',').filter(|s| !s.trim().is_empty()) {
                    let (key, label) = item.split_once(':').ok_or_else(|| {
                        MonitorError::invalid_field(
                            schema,
                            index,
                            format!("enum entry '{}' is not '<raw>:<label>'", item.trim()),
                        )
                    })?;
                    map.insert(key.trim().to_string(), label.trim().to_string());
                }
                Ok(map)
            }
        }
    }
}

impl FieldDocument {
    fn into_field(self, schema: &str, index: usize) -> Result<FieldSpec> {
        let missing = |attr: &str| MonitorError::invalid_field(schema, index, format!("missing '{}'", attr));

        let name = self.name.ok_or_else(|| missing("name"))?;
        let byte_offset = self.byte_offset.ok_or_else(|| missing("byte_offset"))?;
        let bit_offset = self.bit_offset.ok_or_else(|| missing("bit_offset"))?;
        let bit_length = self.bit_length.ok_or_else(|| missing("bit_length"))?;
        let type_name = self.kind.ok_or_else(|| missing("type"))?;

        if name.trim().is_empty() {
            return Err(MonitorError::invalid_field(schema, index, "empty field name"));
        }
        if bit_length == 0 || bit_length > MAX_FIELD_BITS {
            return Err(MonitorError::invalid_field(
                schema,
                index,
                format!("bit_length {} must be between 1 and {}", bit_length, MAX_FIELD_BITS),
            ));
        }

        let kind = match type_name.trim().to_ascii_lowercase().as_str() {
            "uint" => FieldKind::UInt,
            "int" => FieldKind::Int,
            "fixed" => FieldKind::Fixed {
                scale: self.scale.unwrap_or(1.0),
                offset: self.offset.unwrap_or(0.0),
                signed: self.signed.unwrap_or(false),
            },
            "enum" => FieldKind::Enum {
                map: match self.map {
                    Some(doc) => doc.into_map(schema, index)?,
                    None => BTreeMap::new(),
                },
            },
            _ => FieldKind::Unsupported(type_name),
        };

        Ok(FieldSpec {
            name,
            byte_offset,
            bit_offset,
            bit_length,
            kind,
            description: self.description.unwrap_or_default(),
        })
    }
}
