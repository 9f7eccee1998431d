//! Element types.
//!
//! [`Element`] ties a Rust scalar type to its [`DataType`] tag and describes how one element is
//! read from and written to a native-endian byte buffer. It is sealed: the set of numeric dtypes
//! is closed.
//!
//! Elements are decoded with `from_ne_bytes` rather than by casting the buffer pointer, so
//! buffers carry no alignment requirement.

use serde_json::Value;

use crate::dtype::DataType;

mod sealed {
    pub trait Sealed {}
}

pub trait Element: Copy + Send + Sync + 'static + sealed::Sealed {
    /// The dtype tag for this element type.
    const TYPE: DataType;

    /// Element width in bytes.
    const BYTE_WIDTH: usize;

    /// Decode one element from exactly `BYTE_WIDTH` native-endian bytes.
    fn read_ne(bytes: &[u8]) -> Self;

    /// Encode one element into exactly `BYTE_WIDTH` bytes.
    fn write_ne(self, out: &mut [u8]);

    fn to_f64(self) -> f64;

    /// Numeric conversion with `as` semantics: floats saturate into integer ranges and NaN
    /// becomes zero.
    fn from_f64(value: f64) -> Self;

    fn to_value(self) -> Value;

    /// Numbers convert numerically, booleans as 0/1, everything else as NaN.
    fn from_value(value: &Value) -> Self {
        Self::from_f64(value_to_f64(value))
    }

    fn to_scalar(self) -> Scalar {
        Scalar::Number(self.to_f64())
    }
}

/// One element of any dtype, as seen by comparators.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Object(Value),
}

pub(crate) fn value_to_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(tag) => non_finite_from_str(tag).unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// JSON numbers can't hold non-finite floats, so they are written as these strings.
pub(crate) fn float_to_value(value: f64) -> Value {
    if value.is_nan() {
        Value::from("NaN")
    } else if value == f64::INFINITY {
        Value::from("Infinity")
    } else if value == f64::NEG_INFINITY {
        Value::from("-Infinity")
    } else {
        Value::from(value)
    }
}

pub(crate) fn non_finite_from_str(tag: &str) -> Option<f64> {
    match tag {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

pub(crate) fn encode_elements<T: Element>(items: impl IntoIterator<Item = T>) -> Vec<u8> {
    let items = items.into_iter();
    let mut out = Vec::with_capacity(items.size_hint().0 * T::BYTE_WIDTH);
    for item in items {
        let start = out.len();
        out.resize(start + T::BYTE_WIDTH, 0);
        item.write_ne(&mut out[start..]);
    }
    out
}

pub(crate) fn decode_elements<T: Element>(bytes: &[u8]) -> Vec<T> {
    bytes.chunks_exact(T::BYTE_WIDTH).map(T::read_ne).collect()
}

macro_rules! impl_element_numeric {
    ($ty:ty, $dtype:ident) => {
        impl_element_numeric!($ty, $dtype, |v| Value::from(v));
    };
    ($ty:ty, $dtype:ident, float) => {
        impl_element_numeric!($ty, $dtype, |v| float_to_value(f64::from(v)));
    };
    ($ty:ty, $dtype:ident, |$v:ident| $to_value:expr) => {
        impl sealed::Sealed for $ty {}

        impl Element for $ty {
            const TYPE: DataType = DataType::$dtype;
            const BYTE_WIDTH: usize = std::mem::size_of::<$ty>();

            fn read_ne(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                <$ty>::from_ne_bytes(raw)
            }

            fn write_ne(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_ne_bytes());
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(value: f64) -> Self {
                value as $ty
            }

            fn to_value(self) -> Value {
                let $v = self;
                $to_value
            }
        }
    };
}

impl sealed::Sealed for bool {}

// Stored as one byte per element, 0 or 1. Any non-zero byte reads as `true`.
impl Element for bool {
    const TYPE: DataType = DataType::Bool;
    const BYTE_WIDTH: usize = 1;

    fn read_ne(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write_ne(self, out: &mut [u8]) {
        out[0] = u8::from(self);
    }

    fn to_f64(self) -> f64 {
        f64::from(u8::from(self))
    }

    fn from_f64(value: f64) -> Self {
        value != 0.0 && !value.is_nan()
    }

    fn to_value(self) -> Value {
        Value::Bool(self)
    }

    fn to_scalar(self) -> Scalar {
        Scalar::Bool(self)
    }
}

impl_element_numeric!(u8, Uint8);
impl_element_numeric!(i8, Int8);
impl_element_numeric!(u16, Uint16);
impl_element_numeric!(i16, Int16);
impl_element_numeric!(u32, Uint32);
impl_element_numeric!(i32, Int32);
impl_element_numeric!(f32, Float32, float);
impl_element_numeric!(f64, Float64, float);

/// Match on a dtype, binding the Rust element type to `$elem` in each numeric arm.
macro_rules! dispatch_numeric {
    ($dtype:expr, |$elem:ident| $body:expr, object => $object:expr) => {
        match $dtype {
            $crate::dtype::DataType::Bool => {
                type $elem = bool;
                $body
            }
            $crate::dtype::DataType::Uint8 => {
                type $elem = u8;
                $body
            }
            $crate::dtype::DataType::Int8 => {
                type $elem = i8;
                $body
            }
            $crate::dtype::DataType::Uint16 => {
                type $elem = u16;
                $body
            }
            $crate::dtype::DataType::Int16 => {
                type $elem = i16;
                $body
            }
            $crate::dtype::DataType::Uint32 => {
                type $elem = u32;
                $body
            }
            $crate::dtype::DataType::Int32 => {
                type $elem = i32;
                $body
            }
            $crate::dtype::DataType::Float32 => {
                type $elem = f32;
                $body
            }
            $crate::dtype::DataType::Float64 => {
                type $elem = f64;
                $body
            }
            $crate::dtype::DataType::Object => $object,
        }
    };
}

pub(crate) use dispatch_numeric;
