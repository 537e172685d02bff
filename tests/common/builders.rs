//! Test data builders for schema documents and channel configs

use busdata_monitor::config::{ChannelConfig, DirectionMode, SchemaRef};
use serde_json::{json, Value};

/// Builder for schema documents in their on-disk JSON shape
pub struct SchemaBuilder {
    name: String,
    length: usize,
    fields: Vec<Value>,
}

impl SchemaBuilder {
    pub fn new(name: &str, length: usize) -> Self {
        Self {
            name: name.to_string(),
            length,
            fields: Vec::new(),
        }
    }

    fn field(mut self, name: &str, byte: u32, bit: u32, len: u32, kind: &str, extra: Value) -> Self {
        let mut field = json!({
            "name": name,
            "byte_offset": byte,
            "bit_offset": bit,
            "bit_length": len,
            "type": kind,
        });
        if let (Some(obj), Value::Object(more)) = (field.as_object_mut(), extra) {
            obj.extend(more);
        }
        self.fields.push(field);
        self
    }

    pub fn uint(self, name: &str, byte: u32, bit: u32, len: u32) -> Self {
        self.field(name, byte, bit, len, "uint", json!({}))
    }

    pub fn int(self, name: &str, byte: u32, bit: u32, len: u32) -> Self {
        self.field(name, byte, bit, len, "int", json!({}))
    }

    pub fn fixed(self, name: &str, byte: u32, bit: u32, len: u32, scale: f64, offset: f64) -> Self {
        self.field(name, byte, bit, len, "fixed", json!({"scale": scale, "offset": offset}))
    }

    pub fn enumeration(self, name: &str, byte: u32, bit: u32, len: u32, map: &str) -> Self {
        self.field(name, byte, bit, len, "enum", json!({"map": map}))
    }

    pub fn build(self) -> Value {
        json!({
            "protocol_name": self.name,
            "protocol_length": self.length,
            "version": "1.0",
            "fields": self.fields,
        })
    }
}

/// Builder for validated channel configs
pub struct ChannelBuilder {
    id: String,
    direction: DirectionMode,
    freq: f64,
    schema: SchemaRef,
}

impl ChannelBuilder {
    pub fn new(id: &str, schema: &str) -> Self {
        Self {
            id: id.to_string(),
            direction: DirectionMode::Tx,
            freq: 100.0,
            schema: SchemaRef::Single(schema.to_string()),
        }
    }

    pub fn direction(mut self, direction: DirectionMode) -> Self {
        self.direction = direction;
        self
    }

    pub fn freq(mut self, freq: f64) -> Self {
        self.freq = freq;
        self
    }

    pub fn per_direction(mut self, tx: &str, rx: &str) -> Self {
        self.direction = DirectionMode::Both;
        self.schema = SchemaRef::PerDirection {
            tx: tx.to_string(),
            rx: rx.to_string(),
        };
        self
    }

    pub fn build(self) -> ChannelConfig {
        ChannelConfig::new(self.id, self.direction, self.freq, self.schema).expect("valid channel")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_builder() {
        let doc = SchemaBuilder::new("s", 2).uint("a", 0, 0, 4).build();
        assert_eq!(doc["protocol_length"], 2);
        assert_eq!(doc["fields"][0]["type"], "uint");
    }

    #[test]
    fn test_channel_builder() {
        let cfg = ChannelBuilder::new("CH1", "s").freq(20.0).build();
        assert_eq!(cfg.channel_id, "CH1");
        assert_eq!(cfg.frequency_hz, 20.0);
    }
}
