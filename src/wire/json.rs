//! JSON payload codec.
//!
//! Buffers are written in one of two ways, picked by [`SerializerOptions::binary`]:
//! - inline: `{"type": "bytes", "data": "<base64>"}`
//! - binary: `{"type": "ref", "id": "<n>"}`, with the bytes kept aside in
//!   [`JsonSerializer::buffers`] for the transport to send as separate binary frames.
//!
//! Sequences are written as JSON arrays.

use std::{borrow::Borrow, collections::HashMap, convert::Infallible, fmt};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde_json::{Value, json};

use crate::wire::{Deserializer, Encodable, Serializer, error::DecodeError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SerializerOptions {
    /// Keep buffers out of the JSON and reference them by id.
    pub binary: bool,
}

/// Identifier of an out-of-band buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct BufferRef(String);

impl BufferRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for BufferRef {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BufferRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
pub struct JsonSerializer {
    options: SerializerOptions,
    buffers: Vec<(BufferRef, Bytes)>,
}

impl JsonSerializer {
    pub fn new(options: SerializerOptions) -> Self {
        Self {
            options,
            buffers: Vec::new(),
        }
    }

    /// Buffers collected in binary mode, in the order they were referenced.
    pub fn buffers(&self) -> &[(BufferRef, Bytes)] {
        &self.buffers
    }

    pub fn into_buffers(self) -> Vec<(BufferRef, Bytes)> {
        self.buffers
    }
}

impl Serializer for JsonSerializer {
    type Error = Infallible;

    fn encode(&mut self, value: Encodable<'_>) -> Result<Value, Self::Error> {
        let payload = match value {
            Encodable::Buffer(buffer) if self.options.binary => {
                let id = BufferRef(self.buffers.len().to_string());
                let payload = json!({"type": "ref", "id": id.as_str()});
                // Snapshot: later writes to the array don't leak into a queued frame.
                self.buffers.push((id, buffer.to_bytes()));
                payload
            }
            Encodable::Buffer(buffer) => {
                json!({"type": "bytes", "data": STANDARD.encode(&*buffer.read())})
            }
            Encodable::Sequence(values) => Value::Array(values.to_vec()),
        };
        Ok(payload)
    }
}

/// Reads payloads written by [`JsonSerializer`].
#[derive(Debug, Default)]
pub struct JsonDeserializer {
    buffers: HashMap<BufferRef, Bytes>,
}

impl JsonDeserializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A deserializer that resolves `{"type": "ref"}` payloads against `buffers`.
    pub fn with_buffers(buffers: impl IntoIterator<Item = (BufferRef, Bytes)>) -> Self {
        Self {
            buffers: buffers.into_iter().collect(),
        }
    }
}

impl Deserializer for JsonDeserializer {
    fn decode_buffer(&mut self, payload: &Value) -> Result<Vec<u8>, DecodeError> {
        let Value::Object(fields) = payload else {
            return Err(DecodeError::invalid_payload("buffer payload is not an object"));
        };
        let field = |name: &str| {
            fields.get(name).and_then(Value::as_str).ok_or_else(|| {
                DecodeError::invalid_payload(format!("buffer payload has no string {name:?}"))
            })
        };
        match field("type")? {
            "bytes" => Ok(STANDARD.decode(field("data")?)?),
            "ref" => {
                let id = field("id")?;
                self.buffers
                    .get(id)
                    .map(|bytes| bytes.to_vec())
                    .ok_or_else(|| DecodeError::MissingBuffer { id: id.to_string() })
            }
            other => Err(DecodeError::invalid_payload(format!(
                "unknown buffer payload type {other:?}"
            ))),
        }
    }

    fn decode_sequence(&mut self, payload: &Value) -> Result<Vec<Value>, DecodeError> {
        match payload {
            Value::Array(items) => Ok(items.clone()),
            _ => Err(DecodeError::invalid_payload("sequence payload is not an array")),
        }
    }
}
