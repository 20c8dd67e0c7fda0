//! # retouch-ops
//!
//! The fixed set of photo adjustment operations behind the retouch pipeline.
//!
//! # Modules
//!
//! - [`curve`] - Monotone cubic tone curves baked into 256-entry LUTs
//! - [`blur`] - Three-pass separable box blur ("stack blur") and its downscaled variant
//! - [`resample`] - Bilinear resize for rasters and masks
//! - [`geometry`] - Rotate, straighten, flip, crop and preview scaling in one resampling pass
//! - [`color_matrix`] - 4×5 color matrices, filter presets and the single-pass matrix apply
//! - [`pixel`] - Row-chunked parallel per-pixel engine (tone, white balance, skin, HSL, curves)
//! - [`filter`] - Spatial filters: sharpen, structure, denoise, global blur
//! - [`composite`] - Subject/background compositing over a segmentation mask
//! - [`analyze`] - Histogram-based auto exposure/contrast suggestion
//!
//! Every operation takes its input by reference and returns an owned
//! [`Raster`](retouch_core::Raster). When an operation has nothing to do it
//! returns a clone of its input, which shares the pixel buffer:
//!
//! ```rust
//! use retouch_core::Raster;
//! use retouch_ops::filter::sharpen;
//!
//! let img = Raster::filled(8, 8, [90, 120, 200, 255]);
//! let out = sharpen(&img, 0.0);
//! assert!(out.ptr_eq(&img));
//! ```
//!
//! The only in-place operation is [`blur::stack_blur`], which mutates the
//! raster it is given.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod analyze;
pub mod blur;
pub mod color_matrix;
pub mod composite;
pub mod curve;
pub mod filter;
pub mod geometry;
pub mod pixel;
pub mod resample;

pub use error::{OpsError, OpsResult};

pub use analyze::{auto_params, AutoParams};
pub use color_matrix::{ColorMatrix, FilterPreset};
pub use composite::{BackgroundMode, CompositeOptions};
pub use curve::{CurvePoint, ToneCurve};
pub use geometry::{auto_zoom_scale, GeometryParams, GeometryPlan};
pub use pixel::{HslSector, HslShift, PixelParams, PixelPlan};
