//! Canonical serialization of built model values.
//!
//! Declaration order comes from serde's field order (`serde_json` is built
//! with `preserve_order`); sort-keys mode reorders every object
//! lexicographically.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub sort_keys: bool,
    /// Spaces per nesting level; `0` produces compact output.
    pub indent: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self { sort_keys: false, indent: 2 }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to serialize value: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to decode value: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Default)]
pub struct Encoder {
    config: EncoderConfig,
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> EncoderConfig {
        self.config
    }

    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, EncodeError> {
        let value = serde_json::to_value(value).map_err(EncodeError::Serialize)?;
        self.encode_value(&value)
    }

    pub fn encode_value(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let sorted;
        let value = if self.config.sort_keys {
            sorted = sort_keys(value);
            &sorted
        } else {
            value
        };
        if self.config.indent == 0 {
            return serde_json::to_vec(value).map_err(EncodeError::Serialize);
        }
        let indent = vec![b' '; self.config.indent];
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
        let mut out = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        value.serialize(&mut ser).map_err(EncodeError::Serialize)?;
        Ok(out)
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, EncodeError> {
        let src = std::str::from_utf8(bytes).map_err(|e| EncodeError::Decode(e.to_string()))?;
        crate::path_de::from_json_with_path(src).map_err(EncodeError::Decode)
    }
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = Map::with_capacity(entries.len());
            for (k, v) in entries {
                out.insert(k.clone(), sort_keys(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}
