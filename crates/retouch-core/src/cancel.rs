//! Cooperative cancellation for renders.
//!
//! A [`CancelToken`] is handed to each render invocation. The pipeline checks
//! it at stage boundaries and the pixel engine checks it once per row chunk,
//! so cancellation latency is bounded by one chunk of work.
//!
//! Cancellation is not an error: a cancelled render simply yields
//! [`Cancelled`] and its partial work is dropped.
//!
//! ```rust
//! use retouch_core::CancelToken;
//!
//! let token = CancelToken::new();
//! let seen_by_worker = token.clone();
//! token.cancel();
//! assert!(seen_by_worker.check().is_err());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Marker returned when a render was cancelled before completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, thiserror::Error)]
#[error("render cancelled")]
pub struct Cancelled;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a fresh, non-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any clone.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Returns `Err(Cancelled)` if cancellation was requested.
    #[inline]
    pub fn check(&self) -> std::result::Result<(), Cancelled> {
        if self.is_cancelled() { Err(Cancelled) } else { Ok(()) }
    }
}
