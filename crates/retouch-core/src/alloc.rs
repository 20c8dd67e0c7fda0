//! Fallible allocation for large intermediate buffers.
//!
//! Blur and compositing allocate several full-frame planes. On very large
//! images those allocations can fail; callers use [`try_filled`] and fall
//! back to returning their input unchanged.

use crate::{Error, Result};

/// Allocates a vector of `len` copies of `value`, reporting allocator failure
/// as [`Error::AllocationFailed`] instead of aborting.
pub fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|e| Error::allocation_failed(len, e.to_string()))?;
    v.resize(len, value);
    Ok(v)
}
