use thiserror::Error;

use crate::dtype::DataType;

/// Errors returned while constructing or accessing an [`crate::NDArray`].
#[derive(Debug, Error)]
pub enum ArrayError {
    /// The source cannot be converted to the requested dtype (object arrays from raw bytes).
    #[error("cannot build a {dtype} array from a raw byte buffer")]
    InvalidInput { dtype: DataType },
    /// `product(shape)` doesn't match the element count. Only raised when shape validation is on.
    #[error("shape mismatch: shape holds {expected} elements, data has {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    /// `product(shape)` overflowed `usize`.
    #[error("shape element count overflow")]
    ShapeOverflow,
    /// The byte buffer length is not a multiple of the element width.
    #[error("byte length {actual} is not a multiple of the element width {width}")]
    InvalidByteLength { width: usize, actual: usize },
    /// Attempted a numeric-only operation on an object array.
    #[error("unsupported for object arrays")]
    UnsupportedObjectDtype,
    /// Typed access with a Rust element type that doesn't match the array's dtype.
    #[error("wrong element type: array is {expected}, requested {requested}")]
    WrongElementType {
        expected: DataType,
        requested: DataType,
    },
    #[error("index {index} out of bounds (len={len})")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error(transparent)]
    Ndarray(#[from] ndarray::ShapeError),
}
