//! Typed n-dimensional arrays.
//!
//! This module provides [`NDArray`], a dtype tag plus a shape over one of two kinds of storage:
//! - numeric dtypes (`bool`, `uint8` ... `float64`) hold a shared [`ArrayBuffer`] of
//!   native-endian elements;
//! - the `object` dtype holds arbitrary JSON values, one per element.
//!
//! ## Typing model
//! There is one array type for every dtype. The dtype is a runtime tag ([`DataType`]) and the
//! numeric element types are tied to it by the sealed [`Element`] trait. Typed access
//! ([`NDArray::to_vec`], [`NDArray::set`]) checks that `T::TYPE` matches the array's dtype.
//!
//! ## Sharing
//! Numeric arrays built from an existing [`ArrayBuffer`] alias it by default: writes through the
//! buffer are visible through the array and the other way around. `Clone` on an `NDArray` shares
//! the buffer as well. Use [`NDArray::deep_clone`] or the `copy` construction option for an
//! isolated copy.
//!
//! ```rust,ignore
//! use ndwire::{ArrayBuffer, DataType, NDArray};
//!
//! let buffer = ArrayBuffer::from_vec(vec![0u8; 8]);
//! let arr = NDArray::from_buffer(DataType::Int32, buffer.clone(), None, false).unwrap();
//! buffer.write()[..4].copy_from_slice(&5i32.to_ne_bytes());
//! assert_eq!(arr.to_vec::<i32>().unwrap(), vec![5, 0]);
//! ```
//!
//! ## Shape checking
//! Construction does not require `product(shape)` to equal the element count. A mismatch is
//! logged at `warn` level and otherwise accepted. [`ArrayOptions::validate_shape`] turns it into
//! [`ArrayError::ShapeMismatch`].
//!
//! ## ndarray interop
//! - [`NDArray::to_ndarray`] copies the elements into an `ndarray::ArrayD<T>`.
//! - [`NDArray::from_ndarray`] copies any `ndarray` array (any layout) in logical order.

use serde_json::Value;
use smallvec::{SmallVec, smallvec};

use crate::{
    array::{
        compare::{Comparator, StructuralComparator},
        element::{Scalar, decode_elements, dispatch_numeric, encode_elements},
        factory::{ArrayOptions, ArraySource},
        util::num_elements,
    },
    dtype::DataType,
};

pub use crate::array::{buffer::ArrayBuffer, element::Element, error::ArrayError};

pub mod buffer;
pub mod compare;
pub mod element;
pub mod error;
pub mod factory;
pub mod util;

pub type Shape = SmallVec<[usize; 4]>;

#[derive(Debug, Clone)]
enum Storage {
    Numeric(ArrayBuffer),
    Object(Vec<Value>),
}

/// A typed n-dimensional array.
#[derive(Debug, Clone)]
pub struct NDArray {
    dtype: DataType,
    shape: Shape,
    storage: Storage,
}

impl NDArray {
    /// Build an array of `dtype` from any [`ArraySource`].
    ///
    /// # Arguments
    /// - `dtype`: The element type of the new array.
    /// - `source`: Raw bytes, a value sequence, a typed vector or another array.
    /// - `options`: `shape` overrides the inherited/default shape, `copy` forces numeric arrays
    ///   to own fresh memory, `validate_shape` enables the element count check. `options.dtype`
    ///   is ignored here; see [`crate::ndarray`] for dtype inference.
    ///
    /// # Errors
    /// - [`ArrayError::InvalidInput`] for an object array built from a raw byte buffer.
    /// - [`ArrayError::InvalidByteLength`] when a byte buffer isn't a whole number of elements.
    /// - [`ArrayError::ShapeMismatch`] / [`ArrayError::ShapeOverflow`] with `validate_shape`.
    pub fn from_source(
        dtype: DataType,
        source: ArraySource,
        options: &ArrayOptions,
    ) -> Result<Self, ArrayError> {
        let (storage, inherited) = dispatch_numeric!(
            dtype,
            |E| numeric_storage::<E>(source, options.copy)?,
            object => object_storage(source)?
        );
        let shape = options.shape.clone().or(inherited);
        Self::assemble(dtype, storage, shape, options.validate_shape)
    }

    /// Build a numeric array that takes ownership of `data`.
    pub fn from_vec<T: Element>(data: Vec<T>, shape: Option<&[usize]>) -> Self {
        let len = data.len();
        let shape = resolve_shape_lenient(len, shape.map(Shape::from_slice));
        Self {
            dtype: T::TYPE,
            shape,
            storage: Storage::Numeric(ArrayBuffer::from_vec(encode_elements(data))),
        }
    }

    /// Build a numeric array over `buffer`.
    ///
    /// Without `copy` the array aliases `buffer`; with `copy` it owns a snapshot.
    ///
    /// # Errors
    /// [`ArrayError::InvalidInput`] for [`DataType::Object`], [`ArrayError::InvalidByteLength`]
    /// when the buffer length isn't a multiple of the element width.
    pub fn from_buffer(
        dtype: DataType,
        buffer: ArrayBuffer,
        shape: Option<&[usize]>,
        copy: bool,
    ) -> Result<Self, ArrayError> {
        let options = ArrayOptions {
            shape: shape.map(Shape::from_slice),
            copy,
            ..ArrayOptions::default()
        };
        Self::from_source(dtype, ArraySource::Buffer(buffer), &options)
    }

    /// Build an array of `dtype` from a value sequence.
    ///
    /// Numeric dtypes convert each value (see [`Element::from_value`]); `object` keeps them.
    pub fn from_values(dtype: DataType, values: Vec<Value>, shape: Option<&[usize]>) -> Self {
        let storage = dispatch_numeric!(
            dtype,
            |E| Storage::Numeric(ArrayBuffer::from_vec(encode_elements(
                values.iter().map(E::from_value)
            ))),
            object => Storage::Object(values)
        );
        let len = storage_len(dtype, &storage);
        Self {
            dtype,
            shape: resolve_shape_lenient(len, shape.map(Shape::from_slice)),
            storage,
        }
    }

    fn assemble(
        dtype: DataType,
        storage: Storage,
        shape: Option<Shape>,
        validate: bool,
    ) -> Result<Self, ArrayError> {
        let len = storage_len(dtype, &storage);
        let shape = if validate {
            let shape = shape.unwrap_or_else(|| smallvec![len]);
            let expected = num_elements(&shape)?;
            if expected != len {
                return Err(ArrayError::ShapeMismatch {
                    expected,
                    actual: len,
                });
            }
            shape
        } else {
            resolve_shape_lenient(len, shape)
        };
        Ok(Self {
            dtype,
            shape,
            storage,
        })
    }

    pub const fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions, always `shape().len()`.
    pub fn dimension(&self) -> usize {
        self.shape.len()
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        storage_len(self.dtype, &self.storage)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The shared byte buffer of a numeric array, `None` for object arrays.
    pub fn buffer(&self) -> Option<&ArrayBuffer> {
        match &self.storage {
            Storage::Numeric(buffer) => Some(buffer),
            Storage::Object(_) => None,
        }
    }

    /// The elements of an object array, `None` for numeric arrays.
    pub fn values(&self) -> Option<&[Value]> {
        match &self.storage {
            Storage::Numeric(_) => None,
            Storage::Object(values) => Some(values),
        }
    }

    /// Copy the elements out as `T`.
    ///
    /// # Errors
    /// [`ArrayError::WrongElementType`] if `T` doesn't match the array's dtype.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, ArrayError> {
        let buffer = self.typed_buffer::<T>()?;
        let bytes = buffer.read();
        Ok(decode_elements(&bytes))
    }

    /// Overwrite one element in place. Every array sharing the buffer observes the write.
    pub fn set<T: Element>(&self, index: usize, value: T) -> Result<(), ArrayError> {
        let buffer = self.typed_buffer::<T>()?;
        let len = self.len();
        if index >= len {
            return Err(ArrayError::IndexOutOfBounds { index, len });
        }
        let start = index * T::BYTE_WIDTH;
        let mut bytes = buffer.write();
        value.write_ne(&mut bytes[start..start + T::BYTE_WIDTH]);
        Ok(())
    }

    fn typed_buffer<T: Element>(&self) -> Result<&ArrayBuffer, ArrayError> {
        if T::TYPE != self.dtype {
            return Err(ArrayError::WrongElementType {
                expected: self.dtype,
                requested: T::TYPE,
            });
        }
        match &self.storage {
            Storage::Numeric(buffer) => Ok(buffer),
            Storage::Object(_) => Err(ArrayError::UnsupportedObjectDtype),
        }
    }

    /// The logical contents as a plain sequence of JSON values.
    ///
    /// Non-finite floats have no JSON number form and become the strings `"NaN"`, `"Infinity"`
    /// and `"-Infinity"`.
    pub fn to_values(&self) -> Vec<Value> {
        match &self.storage {
            Storage::Object(values) => values.clone(),
            Storage::Numeric(buffer) => {
                let bytes = buffer.read();
                dispatch_numeric!(
                    self.dtype,
                    |E| decode_elements::<E>(&bytes).into_iter().map(E::to_value).collect(),
                    object => Vec::new()
                )
            }
        }
    }

    /// The elements as [`Scalar`]s, in storage order.
    pub fn scalars(&self) -> Vec<Scalar> {
        match &self.storage {
            Storage::Object(values) => values.iter().cloned().map(Scalar::Object).collect(),
            Storage::Numeric(buffer) => {
                let bytes = buffer.read();
                dispatch_numeric!(
                    self.dtype,
                    |E| decode_elements::<E>(&bytes).into_iter().map(E::to_scalar).collect(),
                    object => Vec::new()
                )
            }
        }
    }

    fn to_f64_vec(&self) -> Option<Vec<f64>> {
        let Storage::Numeric(buffer) = &self.storage else {
            return None;
        };
        let bytes = buffer.read();
        dispatch_numeric!(
            self.dtype,
            |E| Some(decode_elements::<E>(&bytes).into_iter().map(E::to_f64).collect()),
            object => None
        )
    }

    /// Deep clone the array into unshared storage.
    pub fn deep_clone(&self) -> NDArray {
        let storage = match &self.storage {
            Storage::Numeric(buffer) => Storage::Numeric(buffer.deep_clone()),
            Storage::Object(values) => Storage::Object(values.clone()),
        };
        NDArray {
            dtype: self.dtype,
            shape: self.shape.clone(),
            storage,
        }
    }

    /// Structural equality: `comparator.eq` on the shapes, then `comparator.arrays` on the
    /// contents. The dtypes are not compared on their own.
    pub fn equals<C: Comparator + ?Sized>(&self, that: &NDArray, comparator: &C) -> bool {
        Comparator::eq(comparator, self.shape(), that.shape()) && comparator.arrays(self, that)
    }

    /// Copy the elements into an `ndarray` with this array's shape.
    ///
    /// # Errors
    /// - [`ArrayError::WrongElementType`] if `T` doesn't match the dtype.
    /// - [`ArrayError::Ndarray`] if the shape doesn't cover the element count.
    pub fn to_ndarray<T: Element>(&self) -> Result<ndarray::ArrayD<T>, ArrayError> {
        let data = self.to_vec::<T>()?;
        Ok(ndarray::ArrayD::from_shape_vec(
            ndarray::IxDyn(&self.shape),
            data,
        )?)
    }

    /// Copy an `ndarray` in logical (row-major) order. Non-contiguous views are fine.
    pub fn from_ndarray<T, S, D>(array: &ndarray::ArrayBase<S, D>) -> Self
    where
        T: Element,
        S: ndarray::Data<Elem = T>,
        D: ndarray::Dimension,
    {
        Self::from_vec(array.iter().copied().collect(), Some(array.shape()))
    }
}

impl PartialEq for NDArray {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, &StructuralComparator)
    }
}

fn storage_len(dtype: DataType, storage: &Storage) -> usize {
    match storage {
        Storage::Numeric(buffer) => buffer.byte_len() / dtype.byte_width().unwrap_or(1),
        Storage::Object(values) => values.len(),
    }
}

fn resolve_shape_lenient(len: usize, shape: Option<Shape>) -> Shape {
    let shape = shape.unwrap_or_else(|| smallvec![len]);
    match num_elements(&shape) {
        Ok(expected) if expected == len => {}
        Ok(expected) => {
            tracing::warn!(?shape, expected, actual = len, "array shape doesn't match its length");
        }
        Err(_) => tracing::warn!(?shape, actual = len, "array shape element count overflows"),
    }
    shape
}

fn numeric_storage<T: Element>(
    source: ArraySource,
    copy: bool,
) -> Result<(Storage, Option<Shape>), ArrayError> {
    let (buffer, inherited) = match source {
        ArraySource::Buffer(buffer) => {
            let actual = buffer.byte_len();
            if actual % T::BYTE_WIDTH != 0 {
                return Err(ArrayError::InvalidByteLength {
                    width: T::BYTE_WIDTH,
                    actual,
                });
            }
            let buffer = if copy { buffer.deep_clone() } else { buffer };
            (buffer, None)
        }
        ArraySource::Values(values) => (
            ArrayBuffer::from_vec(encode_elements(values.iter().map(T::from_value))),
            None,
        ),
        ArraySource::Typed(typed) => (ArrayBuffer::from_vec(typed.into_bytes_as::<T>()), None),
        ArraySource::Array(array) => {
            let buffer = match (&array.storage, array.dtype == T::TYPE) {
                (Storage::Numeric(buffer), true) if copy => buffer.deep_clone(),
                (Storage::Numeric(buffer), true) => buffer.clone(),
                (Storage::Numeric(_), false) => {
                    let converted = array.to_f64_vec().unwrap_or_default();
                    ArrayBuffer::from_vec(encode_elements(converted.into_iter().map(T::from_f64)))
                }
                (Storage::Object(values), _) => {
                    ArrayBuffer::from_vec(encode_elements(values.iter().map(T::from_value)))
                }
            };
            (buffer, Some(array.shape))
        }
    };
    Ok((Storage::Numeric(buffer), inherited))
}

fn object_storage(source: ArraySource) -> Result<(Storage, Option<Shape>), ArrayError> {
    match source {
        ArraySource::Buffer(_) => Err(ArrayError::InvalidInput {
            dtype: DataType::Object,
        }),
        ArraySource::Values(values) => Ok((Storage::Object(values), None)),
        ArraySource::Typed(typed) => Ok((Storage::Object(typed.to_values()), None)),
        ArraySource::Array(array) => {
            let values = array.to_values();
            Ok((Storage::Object(values), Some(array.shape)))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn from_vec_defaults_to_one_dimension() {
        let arr = NDArray::from_vec(vec![1u16, 2, 3], None);
        assert_eq!(arr.dtype(), DataType::Uint16);
        assert_eq!(arr.shape(), &[3]);
        assert_eq!(arr.dimension(), 1);
        assert_eq!(arr.len(), 3);
    }

    #[test]
    fn from_vec_with_shape() {
        let arr = NDArray::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], Some(&[2, 3]));
        assert_eq!(arr.shape(), &[2, 3]);
        assert_eq!(arr.dimension(), 2);
        assert_eq!(arr.to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn mismatched_shape_is_accepted_without_validation() {
        let arr = NDArray::from_vec(vec![1i32, 2, 3], Some(&[2, 2]));
        assert_eq!(arr.shape(), &[2, 2]);
        assert_eq!(arr.len(), 3);
    }

    #[test]
    fn mismatched_shape_rejected_with_validation() {
        let options = ArrayOptions::default().with_shape([2, 2]).validated();
        let err = match NDArray::from_source(
            DataType::Int32,
            ArraySource::from(vec![1i32, 2, 3]),
            &options,
        ) {
            Ok(_) => panic!("expected error"),
            Err(e) => e,
        };
        match err {
            ArrayError::ShapeMismatch { expected, actual } => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn validation_rejects_shape_overflow() {
        let options = ArrayOptions::default()
            .with_shape([usize::MAX, 2])
            .validated();
        let err = NDArray::from_source(DataType::Uint8, ArraySource::from(vec![1u8]), &options)
            .unwrap_err();
        assert!(matches!(err, ArrayError::ShapeOverflow));
    }

    #[test]
    fn buffer_view_aliases_memory() {
        let buffer = ArrayBuffer::new(8);
        let arr = NDArray::from_buffer(DataType::Int32, buffer.clone(), None, false).unwrap();
        assert_eq!(arr.shape(), &[2]);

        buffer.write()[4..8].copy_from_slice(&42i32.to_ne_bytes());
        assert_eq!(arr.to_vec::<i32>().unwrap(), vec![0, 42]);

        arr.set(0, -1i32).unwrap();
        assert_eq!(&buffer.read()[..4], &(-1i32).to_ne_bytes());
    }

    #[test]
    fn buffer_copy_is_isolated() {
        let buffer = ArrayBuffer::new(4);
        let arr = NDArray::from_buffer(DataType::Float32, buffer.clone(), None, true).unwrap();
        buffer.write().copy_from_slice(&1.5f32.to_ne_bytes());
        assert_eq!(arr.to_vec::<f32>().unwrap(), vec![0.0]);
        assert!(!arr.buffer().unwrap().ptr_eq(&buffer));
    }

    #[test]
    fn buffer_with_partial_element_is_rejected() {
        let err = NDArray::from_buffer(DataType::Float64, ArrayBuffer::new(12), None, false)
            .unwrap_err();
        match err {
            ArrayError::InvalidByteLength { width, actual } => {
                assert_eq!(width, 8);
                assert_eq!(actual, 12);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn object_from_buffer_is_invalid_input() {
        let err = NDArray::from_buffer(DataType::Object, ArrayBuffer::new(4), None, false)
            .unwrap_err();
        assert!(matches!(
            err,
            ArrayError::InvalidInput {
                dtype: DataType::Object
            }
        ));
    }

    #[test]
    fn from_array_inherits_shape_and_shares_storage() {
        let src = NDArray::from_vec(vec![1u8, 2, 3, 4, 5, 6], Some(&[3, 2]));
        let arr = NDArray::from_source(
            DataType::Uint8,
            ArraySource::Array(src.clone()),
            &ArrayOptions::default(),
        )
        .unwrap();
        assert_eq!(arr.shape(), &[3, 2]);
        assert!(arr.buffer().unwrap().ptr_eq(src.buffer().unwrap()));
    }

    #[test]
    fn from_array_with_other_dtype_converts() {
        let src = NDArray::from_vec(vec![1.7f64, -2.2, 300.0], Some(&[3, 1]));
        let arr = NDArray::from_source(
            DataType::Int16,
            ArraySource::Array(src),
            &ArrayOptions::default(),
        )
        .unwrap();
        assert_eq!(arr.shape(), &[3, 1]);
        assert_eq!(arr.to_vec::<i16>().unwrap(), vec![1, -2, 300]);
    }

    #[test]
    fn explicit_shape_overrides_inherited_shape() {
        let src = NDArray::from_vec(vec![1i32, 2, 3, 4], Some(&[2, 2]));
        let options = ArrayOptions::default().with_shape([4]).copied();
        let arr = NDArray::from_source(DataType::Int32, ArraySource::Array(src.clone()), &options)
            .unwrap();
        assert_eq!(arr.shape(), &[4]);
        assert!(!arr.buffer().unwrap().ptr_eq(src.buffer().unwrap()));
    }

    #[test]
    fn object_from_numeric_array_copies_values() {
        let src = NDArray::from_vec(vec![true, false], None);
        let arr = NDArray::from_source(
            DataType::Object,
            ArraySource::Array(src),
            &ArrayOptions::default(),
        )
        .unwrap();
        assert_eq!(arr.values().unwrap(), &[json!(true), json!(false)]);
        assert!(arr.buffer().is_none());
    }

    #[test]
    fn from_values_converts_for_numeric_dtypes() {
        let values = vec![json!(1), json!(true), json!("x")];
        let arr = NDArray::from_values(DataType::Uint8, values, None);
        assert_eq!(arr.to_vec::<u8>().unwrap(), vec![1, 1, 0]);
    }

    #[test]
    fn wrong_element_type_is_rejected() {
        let arr = NDArray::from_vec(vec![1i32], None);
        let err = arr.to_vec::<u32>().unwrap_err();
        assert!(matches!(
            err,
            ArrayError::WrongElementType {
                expected: DataType::Int32,
                requested: DataType::Uint32
            }
        ));
    }

    #[test]
    fn set_out_of_bounds() {
        let arr = NDArray::from_vec(vec![0u8; 2], None);
        let err = arr.set(2, 1u8).unwrap_err();
        assert!(matches!(err, ArrayError::IndexOutOfBounds { index: 2, len: 2 }));
    }

    #[test]
    fn deep_clone_is_isolated() {
        let arr = NDArray::from_vec(vec![1i8, 2], None);
        let copy = arr.deep_clone();
        arr.set(0, 9i8).unwrap();
        assert_eq!(copy.to_vec::<i8>().unwrap(), vec![1, 2]);
    }

    #[test]
    fn to_values_tags_non_finite_floats() {
        let arr = NDArray::from_vec(vec![1.0f64, f64::NAN, f64::INFINITY, f64::NEG_INFINITY], None);
        assert_eq!(
            arr.to_values(),
            vec![json!(1.0), json!("NaN"), json!("Infinity"), json!("-Infinity")]
        );
    }

    #[test]
    fn object_copy_of_non_finite_floats_equals_its_source() {
        let src = NDArray::from_vec(vec![f64::NAN, f64::INFINITY, 1.0], None);
        let obj = NDArray::from_source(
            DataType::Object,
            ArraySource::Array(src.clone()),
            &ArrayOptions::default(),
        )
        .unwrap();
        assert!(!obj.values().unwrap().contains(&Value::Null));
        assert_eq!(obj, src);

        let back = NDArray::from_source(
            DataType::Float64,
            ArraySource::Array(obj),
            &ArrayOptions::default(),
        )
        .unwrap();
        let floats = back.to_vec::<f64>().unwrap();
        assert!(floats[0].is_nan());
        assert_eq!(&floats[1..], &[f64::INFINITY, 1.0]);
    }

    #[test]
    fn ndarray_roundtrip() {
        let a = ndarray::Array::from_shape_vec((2, 3), vec![1i32, 2, 3, 4, 5, 6])
            .unwrap()
            .into_dyn();
        let arr = NDArray::from_ndarray(&a);
        assert_eq!(arr.shape(), &[2, 3]);
        let back = arr.to_ndarray::<i32>().unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn from_ndarray_copies_non_contiguous_views() {
        let base = ndarray::Array::from_shape_vec((2, 3), vec![1i32, 2, 3, 4, 5, 6]).unwrap();
        let t = base.view().reversed_axes();
        let arr = NDArray::from_ndarray(&t);
        assert_eq!(arr.shape(), &[3, 2]);
        assert_eq!(arr.to_vec::<i32>().unwrap(), vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn to_ndarray_rejects_bad_shape() {
        let arr = NDArray::from_vec(vec![1u8, 2, 3], Some(&[2, 2]));
        assert!(matches!(arr.to_ndarray::<u8>(), Err(ArrayError::Ndarray(_))));
    }
}
