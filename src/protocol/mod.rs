//! Protocol schemas and the bit-level frame codec
//!
//! # Components
//!
//! - [`ProtocolSchema`] / [`FieldSpec`] - Validated description of a frame layout
//! - [`SchemaRegistry`] - Loads schemas by name on first use and caches them
//! - [`decode`] / [`decode_hex`] - Pure translation of a payload into a [`DecodedFrame`]
//!
//! # Schema Documents
//!
//! Schemas are read from JSON or TOML documents of the form:
//!
//! ```json
//! {
//!   "protocol_name": "nav_status",
//!   "protocol_length": 8,
//!   "version": "1.0",
//!   "fields": [
//!     {"name": "valid", "byte_offset": 0, "bit_offset": 0, "bit_length": 1, "type": "uint"},
//!     {"name": "mode", "byte_offset": 0, "bit_offset": 1, "bit_length": 3, "type": "enum",
//!      "map": "0:Idle,1:Align,2:Nav"},
//!     {"name": "heading", "byte_offset": 1, "bit_offset": 0, "bit_length": 16, "type": "fixed",
//!      "scale": 0.01}
//!   ]
//! }
//! ```

pub mod decoder;
pub mod registry;
pub mod schema;

pub use decoder::{decode, decode_hex, extract_bits, insert_bits, sign_extend, DecodedFrame, DecodedValue};
pub use registry::{BundleSource, DirectorySource, MemorySource, SchemaRegistry, SchemaSource};
pub use schema::{
    EnumMapDocument, FieldDocument, FieldKind, FieldSpec, ProtocolSchema, SchemaDocument,
    MAX_FIELD_BITS,
};
