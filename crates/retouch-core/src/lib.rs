//! # retouch-core
//!
//! Core types for the retouch photo adjustment engine.
//!
//! This crate provides the foundational types used by every other retouch crate:
//!
//! - [`Raster`] - Copy-on-write RGBA8 image buffer
//! - [`Mask`] - Single-channel (alpha-only) segmentation mask
//! - [`Rect`], [`NormRect`] - Pixel and normalized (0..1) regions
//! - [`CancelToken`], [`Cancelled`] - Cooperative render cancellation
//! - [`Error`], [`Result`] - Buffer construction errors
//!
//! ## Crate Structure
//!
//! ```text
//! retouch-core (this crate)
//!    ^
//!    |
//!    +-- retouch-ops (blur, curves, geometry, pixel engine, compositor)
//!    +-- retouch-render (adjustment model, pipeline, history, session)
//!    +-- retouch-cli
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` - Enable serialization for [`NormRect`] and [`Rect`]

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod alloc;
pub mod cancel;
pub mod error;
pub mod mask;
pub mod pixel;
pub mod raster;
pub mod rect;

pub use cancel::{CancelToken, Cancelled};
pub use error::{Error, Result};
pub use mask::Mask;
pub use pixel::{luma_fixed, luma_rec709};
pub use raster::Raster;
pub use rect::{NormRect, Rect};

/// Prelude module for convenient imports.
///
/// ```
/// use retouch_core::prelude::*;
///
/// let img = Raster::filled(4, 4, [128, 128, 128, 255]);
/// assert_eq!(img.dimensions(), (4, 4));
/// ```
pub mod prelude {
    pub use crate::cancel::{CancelToken, Cancelled};
    pub use crate::error::{Error, Result};
    pub use crate::mask::Mask;
    pub use crate::raster::Raster;
    pub use crate::rect::{NormRect, Rect};
}
