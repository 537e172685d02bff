//! Error handling for the bus data monitor
//!
//! This module defines the error taxonomy shared by the protocol codec, the
//! schema registry and the acquisition pipeline, plus a Result alias.

use thiserror::Error;

/// Main error type for busdata-monitor operations
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Requested schema name is absent from the schema source
    #[error("Schema not found: {name}")]
    SchemaNotFound { name: String },

    /// Malformed schema definition, detected at load time
    #[error("Invalid schema '{schema}'{}: {message}", field_index.map(|i| format!(" (field #{i})")).unwrap_or_default())]
    SchemaValidation {
        schema: String,
        field_index: Option<usize>,
        message: String,
    },

    /// A field's bit range exceeds the frame
    #[error("Field '{field}' bits {start}..{} exceed frame of {available} bits", start + length)]
    FieldRange {
        field: String,
        start: usize,
        length: usize,
        available: usize,
    },

    /// Schema declares a field type the decoder does not implement
    #[error("Field '{field}' has unsupported type '{kind}'")]
    UnsupportedFieldKind { field: String, kind: String },

    /// Odd-length or non-hex input string
    #[error("Malformed hex input: {0}")]
    MalformedHex(String),

    /// Errors related to channel/application configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transient frame acquisition failure
    #[error("Source error: {0}")]
    Source(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MonitorError>,
    },
}

impl MonitorError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MonitorError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a schema validation error tied to one field
    pub fn invalid_field(schema: &str, index: usize, message: impl Into<String>) -> Self {
        MonitorError::SchemaValidation {
            schema: schema.to_string(),
            field_index: Some(index),
            message: message.into(),
        }
    }

    /// Strip any context layers and return the underlying error
    pub fn root(&self) -> &MonitorError {
        match self {
            MonitorError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for MonitorError {
    fn from(err: toml::de::Error) -> Self {
        MonitorError::Serialization(err.to_string())
    }
}

/// Result type alias for busdata-monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
