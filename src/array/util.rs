use crate::array::error::ArrayError;

pub fn num_elements(shape: &[usize]) -> Result<usize, ArrayError> {
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(ArrayError::ShapeOverflow)
}

/// Reverse the byte order of every `width`-sized element in place.
pub fn swap_byte_order(bytes: &mut [u8], width: usize) {
    if width <= 1 {
        return;
    }
    for element in bytes.chunks_exact_mut(width) {
        element.reverse();
    }
}
