//! Integration tests for schema sources and the registry
//!
//! These tests validate loading schemas from disk:
//! - Per-file directory sources (JSON and TOML)
//! - Bundle files holding every protocol
//! - Validation errors naming the offending field

mod common;

use busdata_monitor::config::MonitorConfig;
use busdata_monitor::error::MonitorError;
use busdata_monitor::protocol::{BundleSource, DirectorySource, SchemaRegistry};
use common::builders::SchemaBuilder;
use common::write_schema;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn schema_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_schema(
        dir.path(),
        "status",
        &SchemaBuilder::new("status", 1).uint("ready", 0, 0, 1).build(),
    );
    write_schema(
        dir.path(),
        "cmd",
        &SchemaBuilder::new("cmd", 2).uint("opcode", 0, 0, 8).int("arg", 1, 0, 8).build(),
    );
    std::fs::write(
        dir.path().join("volt.toml"),
        r#"
protocol_length = 2
version = "3"

[[fields]]
name = "v"
byte_offset = 0
bit_offset = 0
bit_length = 16
type = "fixed"
scale = 0.001
"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a schema").unwrap();
    dir
}

#[test]
fn test_directory_source_lists_and_loads() {
    let dir = schema_dir();
    let registry = SchemaRegistry::new(DirectorySource::new(dir.path()).unwrap());

    assert_eq!(registry.list().unwrap(), vec!["cmd", "status", "volt"]);

    let volt = registry.get("volt").unwrap();
    assert_eq!(volt.name, "volt");
    assert_eq!(volt.version.as_deref(), Some("3"));

    let frame = registry.decode_hex("cmd", "10 FF").unwrap();
    assert_eq!(frame.get("arg").map(|v| v.to_string()), Some("-1".to_string()));
}

#[test]
fn test_cached_schema_survives_file_removal() {
    let dir = schema_dir();
    let registry = SchemaRegistry::new(DirectorySource::new(dir.path()).unwrap());

    let first = registry.get("status").unwrap();
    std::fs::remove_file(dir.path().join("status.json")).unwrap();
    let second = registry.get("status").unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    registry.invalidate("status");
    assert!(matches!(
        registry.get("status"),
        Err(MonitorError::SchemaNotFound { .. })
    ));
}

#[test]
fn test_missing_attribute_names_field_index() {
    let dir = TempDir::new().unwrap();
    write_schema(
        dir.path(),
        "broken",
        &json!({
            "protocol_length": 1,
            "fields": [
                {"name": "a", "byte_offset": 0, "bit_offset": 0, "bit_length": 1, "type": "uint"},
                {"name": "b", "byte_offset": 0, "bit_offset": 1, "type": "uint"}
            ]
        }),
    );
    let registry = SchemaRegistry::new(DirectorySource::new(dir.path()).unwrap());

    let err = registry.get("broken").unwrap_err();
    match err.root() {
        MonitorError::SchemaValidation {
            schema,
            field_index,
            message,
        } => {
            assert_eq!(schema, "broken");
            assert_eq!(*field_index, Some(1));
            assert!(message.contains("bit_length"));
        }
        other => panic!("expected SchemaValidation, got {:?}", other),
    }
    assert!(registry.cached_names().is_empty());
}

#[test]
fn test_missing_directory_is_config_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    assert!(matches!(
        DirectorySource::new(missing),
        Err(MonitorError::Config(_))
    ));
}

#[test]
fn test_bundle_file_source() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("protocol_info.json");
    let bundle = json!({
        "status": SchemaBuilder::new("status", 1).uint("ready", 0, 0, 1).build(),
        "mode": SchemaBuilder::new("mode", 1).enumeration("m", 0, 0, 2, "0:Off,1:On").build(),
    });
    std::fs::write(&path, bundle.to_string()).unwrap();

    let registry = SchemaRegistry::new(BundleSource::from_file(&path).unwrap());
    assert_eq!(registry.list().unwrap(), vec!["mode", "status"]);
    let frame = registry.decode("mode", &[0x40]).unwrap();
    assert_eq!(frame.get("m").map(|v| v.to_string()), Some("On".to_string()));
}

#[test]
fn test_registry_from_config_prefers_bundle() {
    let dir = schema_dir();
    let bundle_path = dir.path().join("bundle.json");
    std::fs::write(
        &bundle_path,
        json!({"only": SchemaBuilder::new("only", 1).uint("x", 0, 0, 8).build()}).to_string(),
    )
    .unwrap();

    let config = MonitorConfig {
        schema_dir: Some(dir.path().to_path_buf()),
        schema_bundle: Some(bundle_path),
        ..Default::default()
    };
    let registry = SchemaRegistry::from_config(&config).unwrap();
    assert_eq!(registry.list().unwrap(), vec!["only"]);

    let config = MonitorConfig {
        schema_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let registry = SchemaRegistry::from_config(&config).unwrap();
    assert_eq!(registry.list().unwrap().len(), 3);
}

#[test]
fn test_settings_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("monitor.toml");
    let config = MonitorConfig {
        queue_capacity: 256,
        max_rows: 50,
        ..Default::default()
    };
    config.save(&path).unwrap();
    assert_eq!(MonitorConfig::load(&path).unwrap(), config);

    std::fs::write(&path, "queue_capacity = 0").unwrap();
    assert!(MonitorConfig::load(&path).is_err());
    assert_eq!(MonitorConfig::load_or_default(&path), MonitorConfig::default());
}
