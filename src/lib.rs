//! Typed n-dimensional arrays and their wire encoding.
//!
//! - [`NDArray`]: a dtype tag, a shape and a backing store (shared bytes for numeric dtypes,
//!   JSON values for `object`).
//! - [`ndarray`]: builds an array from raw bytes, value sequences, typed vectors or other
//!   arrays, inferring the dtype when none is given.
//! - [`encode`] / [`decode`]: convert arrays to and from [`WireRecord`]s.

pub mod array;
pub mod dtype;
pub mod wire;

pub use array::{
    ArrayBuffer, ArrayError, Element, NDArray, Shape,
    compare::{ApproxComparator, Comparator, StructuralComparator},
    element::Scalar,
    factory::{ArrayOptions, ArraySource, TypedVec, ndarray},
};
pub use dtype::DataType;
pub use wire::{
    BufferRef, ByteOrder, DecodeError, Deserializer, Encodable, JsonDeserializer, JsonSerializer,
    NDARRAY_TYPE, Serializer, SerializerOptions, WireRecord, decode, encode,
};
