//! Subject segmentation seam.
//!
//! The engine never runs a segmentation model itself. A
//! [`SegmentationProvider`] hands it a single-channel mask (0 = background,
//! 255 = subject) for a source image, or `None` when no mask is available.
//! A missing mask turns any background effect into a passthrough.

use retouch_core::{Mask, Raster};
use tracing::warn;

/// Produces subject masks for source images.
///
/// Called from the render session's worker thread, at most once per source.
pub trait SegmentationProvider: Send + Sync {
    /// Returns the subject mask for `image`, or `None` if segmentation failed
    /// or is unavailable. The mask may be smaller than the image.
    fn segment(&self, image: &Raster) -> Option<Mask>;
}

/// Provider that never returns a mask.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSegmentation;

impl SegmentationProvider for NoSegmentation {
    fn segment(&self, _image: &Raster) -> Option<Mask> {
        None
    }
}

/// Provider serving one precomputed mask, for example loaded from disk.
#[derive(Debug, Clone)]
pub struct StaticMask {
    mask: Mask,
}

impl StaticMask {
    /// Wraps `mask`.
    pub fn new(mask: Mask) -> Self {
        Self { mask }
    }
}

impl SegmentationProvider for StaticMask {
    fn segment(&self, image: &Raster) -> Option<Mask> {
        let (mw, mh) = self.mask.dimensions();
        if mw > image.width() || mh > image.height() {
            warn!(mw, mh, width = image.width(), height = image.height(), "mask larger than image ignored");
            return None;
        }
        Some(self.mask.clone())
    }
}

impl<F> SegmentationProvider for F
where
    F: Fn(&Raster) -> Option<Mask> + Send + Sync,
{
    fn segment(&self, image: &Raster) -> Option<Mask> {
        self(image)
    }
}
