//! The `ndarray` factory.
//!
//! [`ndarray`] picks a dtype for its input (unless one is given) and hands the input to
//! [`NDArray::from_source`].
//!
//! Dtype inference, when [`ArrayOptions::dtype`] is `None`:
//! - a raw [`ArrayBuffer`] is `float64`;
//! - a value sequence of numbers only (or an empty one) is `float64`;
//! - a typed vector keeps its element type (`Vec<i16>` is `int16`, `Vec<bool>` is `bool`);
//! - an existing [`NDArray`] keeps its dtype;
//! - anything else (a value sequence holding strings, objects, ...) is `object`.

use serde_json::Value;

use crate::{
    array::{
        ArrayBuffer, ArrayError, NDArray, Shape,
        element::{Element, encode_elements},
    },
    dtype::DataType,
};

/// Construction options for [`ndarray`] and [`NDArray::from_source`].
///
/// Deserializable so callers can keep defaults in their own config files.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ArrayOptions {
    /// Explicit dtype. `None` infers it from the input.
    pub dtype: Option<DataType>,
    /// Explicit shape. `None` inherits it from a source array, or uses `[len]`.
    pub shape: Option<Shape>,
    /// Give numeric arrays their own copy of a source buffer instead of aliasing it.
    pub copy: bool,
    /// Fail with [`ArrayError::ShapeMismatch`] when `product(shape)` isn't the element count.
    pub validate_shape: bool,
}

impl ArrayOptions {
    pub fn with_dtype(mut self, dtype: DataType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn with_shape(mut self, shape: impl AsRef<[usize]>) -> Self {
        self.shape = Some(Shape::from_slice(shape.as_ref()));
        self
    }

    pub fn copied(mut self) -> Self {
        self.copy = true;
        self
    }

    pub fn validated(mut self) -> Self {
        self.validate_shape = true;
        self
    }
}

/// A typed numeric vector.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedVec {
    Bool(Vec<bool>),
    Uint8(Vec<u8>),
    Int8(Vec<i8>),
    Uint16(Vec<u16>),
    Int16(Vec<i16>),
    Uint32(Vec<u32>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

macro_rules! for_each_typed_vec {
    ($typed:expr, $data:ident => $body:expr) => {
        match $typed {
            TypedVec::Bool($data) => $body,
            TypedVec::Uint8($data) => $body,
            TypedVec::Int8($data) => $body,
            TypedVec::Uint16($data) => $body,
            TypedVec::Int16($data) => $body,
            TypedVec::Uint32($data) => $body,
            TypedVec::Int32($data) => $body,
            TypedVec::Float32($data) => $body,
            TypedVec::Float64($data) => $body,
        }
    };
}

impl TypedVec {
    pub fn dtype(&self) -> DataType {
        fn dtype_of<T: Element>(_: &[T]) -> DataType {
            T::TYPE
        }
        for_each_typed_vec!(self, data => dtype_of(data))
    }

    pub fn len(&self) -> usize {
        for_each_typed_vec!(self, data => data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Native-endian bytes of the elements converted to `T`.
    ///
    /// Same-type input is encoded as is; other types convert through `f64`.
    pub(crate) fn into_bytes_as<T: Element>(self) -> Vec<u8> {
        fn convert<S: Element, T: Element>(data: Vec<S>) -> Vec<u8> {
            if S::TYPE == T::TYPE {
                encode_elements(data)
            } else {
                encode_elements(data.into_iter().map(|v| T::from_f64(v.to_f64())))
            }
        }
        for_each_typed_vec!(self, data => convert::<_, T>(data))
    }

    pub(crate) fn to_values(&self) -> Vec<Value> {
        for_each_typed_vec!(self, data => data.iter().map(|v| v.to_value()).collect())
    }
}

macro_rules! impl_typed_vec_from {
    ($ty:ty, $variant:ident) => {
        impl From<Vec<$ty>> for TypedVec {
            fn from(data: Vec<$ty>) -> Self {
                TypedVec::$variant(data)
            }
        }

        impl From<Vec<$ty>> for ArraySource {
            fn from(data: Vec<$ty>) -> Self {
                ArraySource::Typed(TypedVec::$variant(data))
            }
        }
    };
}

impl_typed_vec_from!(bool, Bool);
impl_typed_vec_from!(u8, Uint8);
impl_typed_vec_from!(i8, Int8);
impl_typed_vec_from!(u16, Uint16);
impl_typed_vec_from!(i16, Int16);
impl_typed_vec_from!(u32, Uint32);
impl_typed_vec_from!(i32, Int32);
impl_typed_vec_from!(f32, Float32);
impl_typed_vec_from!(f64, Float64);

/// Input accepted by [`ndarray`].
#[derive(Debug, Clone)]
pub enum ArraySource {
    /// Raw bytes, reinterpreted per dtype in host byte order.
    Buffer(ArrayBuffer),
    /// A plain sequence of values.
    Values(Vec<Value>),
    Typed(TypedVec),
    Array(NDArray),
}

impl ArraySource {
    /// The dtype picked when none is given explicitly.
    pub fn inferred_dtype(&self) -> DataType {
        match self {
            ArraySource::Buffer(_) => DataType::Float64,
            ArraySource::Values(values) if values.iter().all(Value::is_number) => {
                DataType::Float64
            }
            ArraySource::Values(_) => {
                tracing::debug!("non-numeric value sequence, using object dtype");
                DataType::Object
            }
            ArraySource::Typed(typed) => typed.dtype(),
            ArraySource::Array(array) => array.dtype(),
        }
    }
}

impl From<ArrayBuffer> for ArraySource {
    fn from(buffer: ArrayBuffer) -> Self {
        ArraySource::Buffer(buffer)
    }
}

impl From<Vec<Value>> for ArraySource {
    fn from(values: Vec<Value>) -> Self {
        ArraySource::Values(values)
    }
}

impl From<TypedVec> for ArraySource {
    fn from(typed: TypedVec) -> Self {
        ArraySource::Typed(typed)
    }
}

impl From<NDArray> for ArraySource {
    fn from(array: NDArray) -> Self {
        ArraySource::Array(array)
    }
}

impl From<&NDArray> for ArraySource {
    fn from(array: &NDArray) -> Self {
        ArraySource::Array(array.clone())
    }
}

/// Build an [`NDArray`] from `data`, inferring the dtype unless `options.dtype` is set.
///
/// Numeric arrays built from an [`ArrayBuffer`] (or another array of the same dtype) alias its
/// memory unless `options.copy` is set. `data` itself is never modified.
///
/// # Errors
/// See [`NDArray::from_source`].
pub fn ndarray(
    data: impl Into<ArraySource>,
    options: ArrayOptions,
) -> Result<NDArray, ArrayError> {
    let data = data.into();
    let dtype = match options.dtype {
        Some(dtype) => dtype,
        None => data.inferred_dtype(),
    };
    NDArray::from_source(dtype, data, &options)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn int32_with_explicit_shape() {
        let arr = ndarray(
            vec![json!(1), json!(2), json!(3), json!(4)],
            ArrayOptions::default()
                .with_dtype(DataType::Int32)
                .with_shape([2, 2]),
        )
        .unwrap();
        assert_eq!(arr.dtype(), DataType::Int32);
        assert_eq!(arr.shape(), &[2, 2]);
        assert_eq!(arr.dimension(), 2);
        assert_eq!(arr.to_vec::<i32>().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn strings_infer_object() {
        let arr = ndarray(vec![json!("a"), json!("b")], ArrayOptions::default()).unwrap();
        assert_eq!(arr.dtype(), DataType::Object);
        assert_eq!(arr.shape(), &[2]);
        assert_eq!(arr.values().unwrap(), &[json!("a"), json!("b")]);
    }

    #[test]
    fn numbers_and_buffers_infer_float64() {
        let arr = ndarray(vec![json!(1), json!(2.5)], ArrayOptions::default()).unwrap();
        assert_eq!(arr.dtype(), DataType::Float64);
        assert_eq!(arr.to_vec::<f64>().unwrap(), vec![1.0, 2.5]);

        let empty = ndarray(Vec::<Value>::new(), ArrayOptions::default()).unwrap();
        assert_eq!(empty.dtype(), DataType::Float64);
        assert_eq!(empty.shape(), &[0]);

        let arr = ndarray(ArrayBuffer::new(16), ArrayOptions::default()).unwrap();
        assert_eq!(arr.dtype(), DataType::Float64);
        assert_eq!(arr.shape(), &[2]);
    }

    #[test]
    fn typed_vectors_keep_their_dtype() {
        let cases: Vec<(ArraySource, DataType)> = vec![
            (vec![true].into(), DataType::Bool),
            (vec![1u8].into(), DataType::Uint8),
            (vec![1i8].into(), DataType::Int8),
            (vec![1u16].into(), DataType::Uint16),
            (vec![1i16].into(), DataType::Int16),
            (vec![1u32].into(), DataType::Uint32),
            (vec![1i32].into(), DataType::Int32),
            (vec![1f32].into(), DataType::Float32),
            (vec![1f64].into(), DataType::Float64),
        ];
        for (source, dtype) in cases {
            let arr = ndarray(source, ArrayOptions::default()).unwrap();
            assert_eq!(arr.dtype(), dtype);
            assert_eq!(arr.shape(), &[1]);
        }
    }

    #[test]
    fn every_dtype_reports_shape_and_dimension() {
        for dtype in DataType::ALL {
            let values: Vec<Value> = (0..24).map(|i| json!(i % 2)).collect();
            let arr = ndarray(
                values,
                ArrayOptions::default()
                    .with_dtype(dtype)
                    .with_shape([2, 3, 4])
                    .validated(),
            )
            .unwrap();
            assert_eq!(arr.dtype(), dtype);
            assert_eq!(arr.shape(), &[2, 3, 4]);
            assert_eq!(arr.dimension(), 3);
            assert_eq!(arr.len(), 24);
        }
    }

    #[test]
    fn existing_array_keeps_dtype_and_shape() {
        let src = NDArray::from_vec(vec![1u32, 2, 3, 4, 5, 6], Some(&[2, 3]));
        let arr = ndarray(&src, ArrayOptions::default()).unwrap();
        assert_eq!(arr.dtype(), DataType::Uint32);
        assert_eq!(arr.shape(), &[2, 3]);
    }

    #[test]
    fn typed_vector_converts_to_explicit_dtype() {
        let arr = ndarray(
            vec![1.9f32, -1.0],
            ArrayOptions::default().with_dtype(DataType::Uint8),
        )
        .unwrap();
        assert_eq!(arr.to_vec::<u8>().unwrap(), vec![1, 0]);

        let arr = ndarray(
            vec![0i32, 5],
            ArrayOptions::default().with_dtype(DataType::Bool),
        )
        .unwrap();
        assert_eq!(arr.to_vec::<bool>().unwrap(), vec![false, true]);
    }

    #[test]
    fn unknown_dtype_falls_back_to_object() {
        let arr = ndarray(
            vec![1i32, 2],
            ArrayOptions::default().with_dtype(DataType::resolve("complex64")),
        )
        .unwrap();
        assert_eq!(arr.dtype(), DataType::Object);
        assert_eq!(arr.values().unwrap(), &[json!(1), json!(2)]);
    }

    #[test]
    fn buffer_input_is_aliased_by_default() {
        let buffer = ArrayBuffer::new(4);
        let arr = ndarray(
            buffer.clone(),
            ArrayOptions::default().with_dtype(DataType::Uint16),
        )
        .unwrap();
        buffer.write()[..2].copy_from_slice(&7u16.to_ne_bytes());
        assert_eq!(arr.to_vec::<u16>().unwrap(), vec![7, 0]);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: ArrayOptions =
            serde_json::from_str(r#"{"dtype": "int16", "shape": [3, 1]}"#).unwrap();
        assert_eq!(options.dtype, Some(DataType::Int16));
        assert_eq!(options.shape.as_deref(), Some(&[3usize, 1][..]));
        assert!(!options.copy);
        assert!(!options.validate_shape);
    }
}
