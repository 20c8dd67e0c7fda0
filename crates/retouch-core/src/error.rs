//! Error types for retouch-core buffers.
//!
//! Only buffer construction can fail here. Rendering itself never fails for a
//! valid adjustment set: stages degrade to passthrough instead, and the only
//! non-success outcome of a render is [`crate::Cancelled`].
//!
//! # Usage
//!
//! ```rust
//! use retouch_core::{Error, Raster};
//!
//! let err = Raster::from_data(4, 4, vec![0u8; 3]).unwrap_err();
//! assert!(matches!(err, Error::InvalidDimensions { .. }));
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or accessing image buffers.
#[derive(Debug, Error)]
pub enum Error {
    /// Memory allocation failed.
    ///
    /// Stages that hit this recover by returning their input unchanged.
    #[error("failed to allocate {requested} elements: {reason}")]
    AllocationFailed {
        /// Number of elements that were requested
        requested: usize,
        /// Reason reported by the allocator
        reason: String,
    },

    /// Dimensions do not match the supplied data.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// What was wrong
        reason: String,
    },
}

impl Error {
    /// Creates an [`Error::AllocationFailed`] error.
    pub fn allocation_failed(requested: usize, reason: impl Into<String>) -> Self {
        Self::AllocationFailed {
            requested,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::InvalidDimensions`] error.
    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is an allocation failure.
    pub fn is_allocation_error(&self) -> bool {
        matches!(self, Self::AllocationFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::invalid_dimensions(4, 2, "expected 32 bytes, got 3");
        assert_eq!(err.to_string(), "invalid dimensions: 4x2 (expected 32 bytes, got 3)");
    }

    #[test]
    fn test_allocation_predicate() {
        assert!(Error::allocation_failed(10, "oom").is_allocation_error());
        assert!(!Error::invalid_dimensions(1, 1, "x").is_allocation_error());
    }
}
