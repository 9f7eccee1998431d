//! Shared raw byte buffers.
//!
//! [`ArrayBuffer`] is a cloneable handle to one block of bytes. Cloning the handle never copies
//! the bytes: every clone reads and writes the same memory. Numeric arrays built from a buffer
//! keep a clone of the handle, so writes made through the original handle show up in the array.
//!
//! ```text
//!   ArrayBuffer (caller) ──┐
//!                          ├──> Arc<RwLock<Vec<u8>>>
//!   NDArray<int32> ────────┘
//! ```
//!
//! Individual reads and writes are serialized by a `parking_lot::RwLock`. Callers that share a
//! buffer between components coordinate anything above that themselves.

use std::{fmt, sync::Arc};

use bytes::Bytes;
use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

#[derive(Clone, Default)]
pub struct ArrayBuffer(Arc<RwLock<Vec<u8>>>);

impl ArrayBuffer {
    /// Allocate a zero-filled buffer of `byte_len` bytes.
    pub fn new(byte_len: usize) -> Self {
        Self::from_vec(vec![0u8; byte_len])
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self(Arc::new(RwLock::new(bytes)))
    }

    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        Self::from_vec(bytes.to_vec())
    }

    pub fn byte_len(&self) -> usize {
        self.0.read().len()
    }

    /// Lock the buffer for reading.
    pub fn read(&self) -> MappedRwLockReadGuard<'_, [u8]> {
        RwLockReadGuard::map(self.0.read(), Vec::as_slice)
    }

    /// Lock the buffer for writing. The length is fixed; only the contents can change.
    pub fn write(&self) -> MappedRwLockWriteGuard<'_, [u8]> {
        RwLockWriteGuard::map(self.0.write(), Vec::as_mut_slice)
    }

    /// Copy the current contents into an immutable [`Bytes`] snapshot.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.read())
    }

    /// Copy the bytes into a new, unshared buffer.
    pub fn deep_clone(&self) -> Self {
        Self::copy_from_slice(&self.read())
    }

    /// Whether both handles point at the same memory.
    pub fn ptr_eq(&self, other: &ArrayBuffer) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Vec<u8>> for ArrayBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_vec(bytes)
    }
}

impl From<Bytes> for ArrayBuffer {
    fn from(bytes: Bytes) -> Self {
        Self::from_vec(bytes.to_vec())
    }
}

impl fmt::Debug for ArrayBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayBuffer")
            .field("byte_len", &self.byte_len())
            .finish()
    }
}
