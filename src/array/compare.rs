//! Equality policies for [`NDArray::equals`].

use approx::relative_eq;
use serde_json::Value;

use crate::array::{
    NDArray,
    element::{Scalar, non_finite_from_str},
};

/// Decides when two arrays are equal.
///
/// [`NDArray::equals`] asks [`Comparator::eq`] about the shapes first and only then
/// [`Comparator::arrays`] about the contents.
pub trait Comparator {
    /// Shape equality. Element-wise by default.
    fn eq(&self, a: &[usize], b: &[usize]) -> bool {
        a == b
    }

    /// Content equality.
    fn arrays(&self, a: &NDArray, b: &NDArray) -> bool;
}

/// Exact element-wise equality.
///
/// - numeric elements compare by value (`int32` 1 equals `float64` 1.0), and `NaN` equals `NaN`;
/// - booleans compare as 0/1 against numbers;
/// - object elements compare as JSON values, and numeric JSON values compare numerically with
///   numeric elements (`"NaN"`, `"Infinity"` and `"-Infinity"` stand for the non-finite floats).
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralComparator;

impl Comparator for StructuralComparator {
    fn arrays(&self, a: &NDArray, b: &NDArray) -> bool {
        compare_scalars(a, b, |x, y| x == y || (x.is_nan() && y.is_nan()))
    }
}

/// Element-wise equality with a tolerance on numeric elements.
///
/// Two numbers match when they are identical (infinities included), both `NaN`, within `atol` of
/// each other, or within `rtol` of the larger magnitude. That is [`approx::relative_eq!`] plus
/// the `NaN` rule, so the policy is reflexive and symmetric. Non-numeric elements compare
/// exactly.
#[derive(Debug, Clone, Copy)]
pub struct ApproxComparator {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for ApproxComparator {
    fn default() -> Self {
        Self {
            rtol: 1e-5,
            atol: 1e-8,
        }
    }
}

impl Comparator for ApproxComparator {
    fn arrays(&self, a: &NDArray, b: &NDArray) -> bool {
        compare_scalars(a, b, |x, y| {
            (x.is_nan() && y.is_nan())
                || relative_eq!(x, y, epsilon = self.atol, max_relative = self.rtol)
        })
    }
}

fn compare_scalars(a: &NDArray, b: &NDArray, numbers_eq: impl Fn(f64, f64) -> bool) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let left = a.scalars();
    let right = b.scalars();
    left.iter().zip(&right).all(|(x, y)| scalar_eq(x, y, &numbers_eq))
}

fn scalar_eq(a: &Scalar, b: &Scalar, numbers_eq: &impl Fn(f64, f64) -> bool) -> bool {
    match (a, b) {
        (Scalar::Number(x), Scalar::Number(y)) => numbers_eq(*x, *y),
        (Scalar::Bool(x), Scalar::Bool(y)) => x == y,
        (Scalar::Bool(flag), Scalar::Number(n)) | (Scalar::Number(n), Scalar::Bool(flag)) => {
            numbers_eq(f64::from(u8::from(*flag)), *n)
        }
        (Scalar::Object(Value::Number(x)), Scalar::Object(Value::Number(y))) => {
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => numbers_eq(x, y),
                _ => x == y,
            }
        }
        (Scalar::Object(x), Scalar::Object(y)) => x == y,
        (Scalar::Object(value), other) | (other, Scalar::Object(value)) => {
            object_eq(value, other, numbers_eq)
        }
    }
}

fn object_eq(value: &Value, other: &Scalar, numbers_eq: &impl Fn(f64, f64) -> bool) -> bool {
    match (value, other) {
        (Value::Number(n), Scalar::Number(y)) => n.as_f64().is_some_and(|x| numbers_eq(x, *y)),
        (Value::String(tag), Scalar::Number(y)) => {
            non_finite_from_str(tag).is_some_and(|x| numbers_eq(x, *y))
        }
        (Value::Bool(x), Scalar::Bool(y)) => x == y,
        _ => false,
    }
}
