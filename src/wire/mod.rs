//! Wire encoding of arrays.
//!
//! [`encode`] turns an [`NDArray`] into a [`WireRecord`]:
//!
//! ```json
//! {
//!   "type": "ndarray",
//!   "array": <payload produced by the serializer>,
//!   "order": "little_endian",
//!   "dtype": "int32",
//!   "shape": [2, 2]
//! }
//! ```
//!
//! The payload is opaque to this module. Numeric arrays hand their raw [`ArrayBuffer`] to the
//! [`Serializer`] (the encoder never copies it); object arrays hand over their elements as a
//! plain sequence. `order` is the byte order of the host that produced the record: raw buffers
//! are native-endian, so [`decode`] byte-swaps them when it runs on a host of the other order.
//!
//! [`JsonSerializer`] / [`JsonDeserializer`] are the reference payload codec (base64 or
//! out-of-band binary buffers).

use serde_json::Value;
use smallvec::SmallVec;

use crate::{
    array::{
        ArrayBuffer, NDArray,
        factory::{ArrayOptions, ArraySource},
        util::swap_byte_order,
    },
    dtype::DataType,
};

pub use crate::wire::{
    error::DecodeError,
    json::{BufferRef, JsonDeserializer, JsonSerializer, SerializerOptions},
};

pub mod error;
pub mod json;

/// Discriminator stored in [`WireRecord::kind`].
pub const NDARRAY_TYPE: &str = "ndarray";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// Byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        }
    }
}

/// The self-describing envelope produced by [`encode`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WireRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub array: Value,
    pub order: ByteOrder,
    pub dtype: DataType,
    pub shape: SmallVec<[usize; 4]>,
}

impl WireRecord {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a record from JSON text. `json` is used as scratch space by the parser.
    pub fn from_json_slice(json: &mut [u8]) -> Result<Self, DecodeError> {
        Ok(simd_json::serde::from_slice(json)?)
    }
}

/// What [`encode`] hands to a [`Serializer`].
#[derive(Debug, Clone, Copy)]
pub enum Encodable<'a> {
    /// The backing buffer of a numeric array, not copied.
    Buffer(&'a ArrayBuffer),
    /// The elements of an object array.
    Sequence(&'a [Value]),
}

/// Turns array contents into a payload value.
pub trait Serializer {
    type Error;

    fn encode(&mut self, value: Encodable<'_>) -> Result<Value, Self::Error>;
}

/// Reverses a [`Serializer`].
pub trait Deserializer {
    /// Raw native-endian bytes from a buffer payload.
    fn decode_buffer(&mut self, payload: &Value) -> Result<Vec<u8>, DecodeError>;

    /// Elements from a sequence payload.
    fn decode_sequence(&mut self, payload: &Value) -> Result<Vec<Value>, DecodeError>;
}

/// Encode `array` into a [`WireRecord`] stamped with the host byte order.
///
/// # Errors
/// Only the serializer can fail; its error is returned unchanged.
pub fn encode<S: Serializer + ?Sized>(
    array: &NDArray,
    serializer: &mut S,
) -> Result<WireRecord, S::Error> {
    tracing::trace!(dtype = %array.dtype(), shape = ?array.shape(), "encoding ndarray");
    let payload = match array.buffer() {
        Some(buffer) => serializer.encode(Encodable::Buffer(buffer))?,
        None => serializer.encode(Encodable::Sequence(array.values().unwrap_or_default()))?,
    };
    Ok(WireRecord {
        kind: NDARRAY_TYPE.to_string(),
        array: payload,
        order: ByteOrder::native(),
        dtype: array.dtype(),
        shape: SmallVec::from_slice(array.shape()),
    })
}

/// Rebuild an array from a [`WireRecord`].
///
/// Numeric payloads recorded in the other byte order are byte-swapped before use. The record's
/// shape is taken as is; see [`NDArray`] for how shape mismatches are treated.
pub fn decode<D: Deserializer + ?Sized>(
    record: &WireRecord,
    deserializer: &mut D,
) -> Result<NDArray, DecodeError> {
    if record.kind != NDARRAY_TYPE {
        return Err(DecodeError::UnexpectedType {
            kind: record.kind.clone(),
        });
    }
    tracing::trace!(
        dtype = %record.dtype,
        shape = ?record.shape,
        order = ?record.order,
        "decoding ndarray"
    );

    let options = ArrayOptions {
        shape: Some(record.shape.clone()),
        ..ArrayOptions::default()
    };
    let source = match record.dtype.byte_width() {
        Some(width) => {
            let mut bytes = deserializer.decode_buffer(&record.array)?;
            if record.order != ByteOrder::native() {
                swap_byte_order(&mut bytes, width);
            }
            ArraySource::Buffer(ArrayBuffer::from_vec(bytes))
        }
        None => ArraySource::Values(deserializer.decode_sequence(&record.array)?),
    };
    Ok(NDArray::from_source(record.dtype, source, &options)?)
}

impl NDArray {
    /// Shorthand for [`encode`].
    pub fn encode<S: Serializer + ?Sized>(
        &self,
        serializer: &mut S,
    ) -> Result<WireRecord, S::Error> {
        encode(self, serializer)
    }
}
