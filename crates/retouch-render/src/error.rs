//! Error types for configuration and adjustment loading.
//!
//! Rendering itself never fails for a valid adjustment set; its only
//! unsuccessful outcome is [`Cancelled`](retouch_core::Cancelled).

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading configuration or stored adjustments.
#[derive(Error, Debug)]
pub enum RenderError {
    /// File could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// RON text could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Value could not be serialized.
    #[error("serialize error: {0}")]
    Serialize(#[from] ron::Error),

    /// Operation-level failure (for example an invalid curve).
    #[error(transparent)]
    Ops(#[from] retouch_ops::OpsError),
}

impl RenderError {
    /// Creates an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Result type for configuration and adjustment loading.
pub type RenderResult<T> = Result<T, RenderError>;
