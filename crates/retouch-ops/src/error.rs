//! Error types for adjustment operations.

use thiserror::Error;

/// Error type for adjustment operations.
#[derive(Error, Debug)]
pub enum OpsError {
    /// Invalid dimensions specified.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Buffers have incompatible sizes.
    #[error("size mismatch: {0}")]
    SizeMismatch(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Buffer construction failed.
    #[error(transparent)]
    Core(#[from] retouch_core::Error),
}

/// Result type for adjustment operations.
pub type OpsResult<T> = Result<T, OpsError>;
