//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use busdata_monitor::protocol::{MemorySource, SchemaRegistry};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// How long pipeline tests let producers run
pub fn run_window() -> Duration {
    Duration::from_millis(150)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Registry over a fixed set of JSON schema documents
pub fn registry_from(schemas: &[(&str, serde_json::Value)]) -> Arc<SchemaRegistry> {
    let bundle: serde_json::Map<String, serde_json::Value> = schemas
        .iter()
        .map(|(name, doc)| (name.to_string(), doc.clone()))
        .collect();
    let text = serde_json::Value::Object(bundle).to_string();
    Arc::new(SchemaRegistry::new(
        MemorySource::from_json(&text).expect("valid bundle"),
    ))
}

/// Write one schema document into a directory as `<name>.json`
pub fn write_schema(dir: &Path, name: &str, doc: &serde_json::Value) {
    let path = dir.join(format!("{}.json", name));
    std::fs::write(path, serde_json::to_string_pretty(doc).expect("serialize"))
        .expect("write schema");
}
