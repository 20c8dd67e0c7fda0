//! Auto-enhance analyzer.
//!
//! Suggests an exposure and contrast correction from a luminance histogram
//! of a downscaled copy of the image. The 0.5th and 99.5th percentile levels
//! give the occupied tonal range; the mean gives the exposure offset.

use retouch_core::{luma_rec709, Raster};
#[allow(unused_imports)]
use tracing::{debug, trace};

use crate::resample::{fit_within, resize};

/// Suggested corrections.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AutoParams {
    /// Exposure in stops, `[-0.5, 0.5]`.
    pub exposure: f32,
    /// Contrast multiplier, `[0.8, 1.4]`.
    pub contrast: f32,
}

impl Default for AutoParams {
    fn default() -> Self {
        Self { exposure: 0.0, contrast: 1.0 }
    }
}

/// Analyzes `src` at a long edge of at most `edge` pixels.
///
/// An empty image yields the neutral [`AutoParams::default`].
pub fn auto_params(src: &Raster, edge: u32) -> AutoParams {
    if src.is_empty() {
        return AutoParams::default();
    }
    let (w, h) = fit_within(src.width(), src.height(), edge);
    let small = resize(src, w, h);

    let mut hist = [0u32; 256];
    let mut sum = 0u64;
    for px in small.data().chunks_exact(Raster::CHANNELS) {
        let y = luma_rec709(px[0], px[1], px[2]);
        hist[y as usize] += 1;
        sum += y as u64;
    }
    let total = small.pixel_count() as u32;
    let threshold = (total as f32 * 0.005) as u32;

    let low = percentile_level(hist.iter().enumerate(), threshold).unwrap_or(0);
    let high = percentile_level(hist.iter().enumerate().rev(), threshold).unwrap_or(255);
    let range = high.saturating_sub(low).max(1);
    let mean = sum as f32 / total as f32;

    let contrast = (1.0 + (255.0 / range as f32 - 1.0) * 0.25).clamp(0.8, 1.4);
    let exposure = ((0.5 - mean / 255.0) * 1.5).clamp(-0.5, 0.5);
    debug!(low, high, mean, exposure, contrast, "auto params");
    AutoParams { exposure, contrast }
}

/// First level whose cumulative count exceeds `threshold`.
fn percentile_level<'a>(
    bins: impl Iterator<Item = (usize, &'a u32)>,
    threshold: u32,
) -> Option<usize> {
    let mut acc = 0u32;
    for (level, &count) in bins {
        acc += count;
        if acc > threshold {
            return Some(level);
        }
    }
    None
}
