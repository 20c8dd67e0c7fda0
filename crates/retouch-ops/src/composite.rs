//! Background compositor.
//!
//! Separates subject from background with an externally produced
//! segmentation mask (0 = background, 255 = subject) and either removes the
//! background or replaces it with a blurred copy of the image.
//!
//! The mask is normalized at a bounded working resolution: downscaled so its
//! long edge is at most `mask_edge`, binarized, feathered with the stack blur,
//! then scaled to the image size. Blending runs one row at a time:
//!
//! | mask   | blur                 | remove                    |
//! |--------|----------------------|---------------------------|
//! | 255    | original             | original                  |
//! | 0      | blurred background   | transparent `[0,0,0,0]`   |
//! | between| linear blend         | original RGB, alpha × m   |

use rayon::prelude::*;
use retouch_core::{Mask, Raster};
#[allow(unused_imports)]
use tracing::{debug, trace, warn};

use crate::blur::{blur_downscaled, stack_blur_mask};
use crate::resample::{fit_within, resize_mask};

/// What to do with the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BackgroundMode {
    /// Leave the image alone.
    #[default]
    None,
    /// Make the background transparent.
    Remove,
    /// Replace the background with a blurred copy.
    Blur,
}

/// Working-resolution limits for [`composite`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeOptions {
    /// Long-edge cap for mask normalization.
    pub mask_edge: u32,
    /// Feather radius at the mask working resolution.
    pub feather_radius: i32,
    /// Long-edge cap for the background blur.
    pub blur_edge: u32,
}

impl Default for CompositeOptions {
    fn default() -> Self {
        Self {
            mask_edge: 1024,
            feather_radius: 3,
            blur_edge: 1024,
        }
    }
}

/// Composites `src` according to `mode`.
///
/// Returns a clone sharing the input buffer when `mode` is
/// [`BackgroundMode::None`] or no mask is available.
pub fn composite(
    src: &Raster,
    mask: Option<&Mask>,
    mode: BackgroundMode,
    blur_radius: i32,
    opts: &CompositeOptions,
) -> Raster {
    if mode == BackgroundMode::None || src.is_empty() {
        return src.clone();
    }
    let Some(mask) = mask else {
        warn!(?mode, "background effect requested without a segmentation mask");
        return src.clone();
    };
    if mask.width() == 0 || mask.height() == 0 {
        warn!(?mode, "empty segmentation mask ignored");
        return src.clone();
    }
    trace!(width = src.width(), height = src.height(), ?mode, blur_radius, "composite");

    let alpha = normalize_mask(mask, src.width(), src.height(), opts);
    let background = match mode {
        BackgroundMode::Blur => Some(blur_downscaled(src, blur_radius, opts.blur_edge)),
        _ => None,
    };

    let stride = src.row_stride();
    let w = src.width() as usize;
    let mut out = src.clone();
    out.data_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let m_row = &alpha.data()[y * w..(y + 1) * w];
            let bg_row = background.as_ref().map(|bg| bg.row(y as u32));
            for (x, px) in row.chunks_exact_mut(Raster::CHANNELS).enumerate() {
                let m = m_row[x];
                if m == 255 {
                    continue;
                }
                match bg_row {
                    Some(bg) => {
                        let b = &bg[x * 4..x * 4 + 4];
                        for c in 0..4 {
                            px[c] = blend(px[c], b[c], m);
                        }
                    }
                    None if m == 0 => px.copy_from_slice(&[0, 0, 0, 0]),
                    None => px[3] = scale(px[3], m),
                }
            }
        });
    out
}

/// Feathered mask at `width × height`.
pub fn normalize_mask(mask: &Mask, width: u32, height: u32, opts: &CompositeOptions) -> Mask {
    let (ww, wh) = fit_within(mask.width(), mask.height(), opts.mask_edge);
    let mut working = resize_mask(mask, ww, wh);
    working.binarize();
    stack_blur_mask(&mut working, opts.feather_radius);
    debug!(working_w = ww, working_h = wh, feather = opts.feather_radius, "mask normalized");
    resize_mask(&working, width, height)
}

/// `fg·m + bg·(255 − m)`, normalized and rounded.
#[inline]
fn blend(fg: u8, bg: u8, m: u8) -> u8 {
    let (fg, bg, m) = (fg as u32, bg as u32, m as u32);
    ((fg * m + bg * (255 - m) + 127) / 255) as u8
}

#[inline]
fn scale(v: u8, m: u8) -> u8 {
    ((v as u32 * m as u32 + 127) / 255) as u8
}
