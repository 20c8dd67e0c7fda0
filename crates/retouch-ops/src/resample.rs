//! Bilinear resampling for rasters and masks.
//!
//! Samples are taken at pixel centers, so resizing to the same size is an
//! exact copy and a downscale by two averages 2×2 blocks.
//!
//! # Example
//!
//! ```rust
//! use retouch_core::Raster;
//! use retouch_ops::resample::{fit_within, resize};
//!
//! let img = Raster::filled(400, 200, [10, 20, 30, 255]);
//! let (w, h) = fit_within(img.width(), img.height(), 100);
//! let small = resize(&img, w, h);
//! assert_eq!(small.dimensions(), (100, 50));
//! ```

use rayon::prelude::*;
use retouch_core::{Mask, Raster};
#[allow(unused_imports)]
use tracing::trace;

/// Resizes a raster with bilinear interpolation.
///
/// Returns a clone sharing the buffer when the size is unchanged.
pub fn resize(src: &Raster, width: u32, height: u32) -> Raster {
    if src.dimensions() == (width, height) {
        return src.clone();
    }
    trace!(from_w = src.width(), from_h = src.height(), width, height, "resize");
    let data = resize_channels(src.data(), src.width(), src.height(), Raster::CHANNELS, width, height);
    Raster::from_data(width, height, data).unwrap_or_else(|_| Raster::new(width, height))
}

/// Resizes a mask with bilinear interpolation.
pub fn resize_mask(src: &Mask, width: u32, height: u32) -> Mask {
    if src.dimensions() == (width, height) {
        return src.clone();
    }
    trace!(from_w = src.width(), from_h = src.height(), width, height, "resize_mask");
    let data = resize_channels(src.data(), src.width(), src.height(), 1, width, height);
    Mask::from_data(width, height, data).unwrap_or_else(|_| Mask::new(width, height))
}

/// Dimensions of `width × height` scaled so the long edge is at most
/// `max_edge`. Never upscales; each side is at least 1.
pub fn fit_within(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let long = width.max(height);
    if max_edge == 0 || long <= max_edge {
        return (width, height);
    }
    let scale = max_edge as f32 / long as f32;
    (
        ((width as f32 * scale).round() as u32).max(1),
        ((height as f32 * scale).round() as u32).max(1),
    )
}

fn resize_channels(
    src: &[u8],
    sw: u32,
    sh: u32,
    channels: usize,
    dw: u32,
    dh: u32,
) -> Vec<u8> {
    let (sw, sh, dw, dh) = (sw as usize, sh as usize, dw as usize, dh as usize);
    let mut dst = vec![0u8; dw * dh * channels];
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
        return dst;
    }

    let sx = sw as f32 / dw as f32;
    let sy = sh as f32 / dh as f32;
    // horizontal taps are the same for every row
    let taps: Vec<(usize, usize, f32)> = (0..dw).map(|x| tap(x, sx, sw)).collect();

    dst.par_chunks_mut(dw * channels).enumerate().for_each(|(y, row)| {
        let (y0, y1, fy) = tap(y, sy, sh);
        let r0 = &src[y0 * sw * channels..(y0 + 1) * sw * channels];
        let r1 = &src[y1 * sw * channels..(y1 + 1) * sw * channels];
        for (x, &(x0, x1, fx)) in taps.iter().enumerate() {
            for c in 0..channels {
                let a = r0[x0 * channels + c] as f32;
                let b = r0[x1 * channels + c] as f32;
                let d = r1[x0 * channels + c] as f32;
                let e = r1[x1 * channels + c] as f32;
                let top = a + (b - a) * fx;
                let bottom = d + (e - d) * fx;
                let v = top + (bottom - top) * fy;
                row[x * channels + c] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    });
    dst
}

/// Source neighbours and weight for destination index `i`.
#[inline]
fn tap(i: usize, scale: f32, len: usize) -> (usize, usize, f32) {
    let pos = ((i as f32 + 0.5) * scale - 0.5).max(0.0);
    let i0 = (pos.floor() as usize).min(len - 1);
    let i1 = (i0 + 1).min(len - 1);
    (i0, i1, pos - i0 as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_size_shares_buffer() {
        let img = Raster::filled(5, 5, [1, 2, 3, 4]);
        assert!(resize(&img, 5, 5).ptr_eq(&img));
    }

    #[test]
    fn test_downscale_averages_blocks() {
        let img = Raster::from_data(2, 1, vec![0, 0, 0, 255, 200, 100, 50, 255]).unwrap();
        let out = resize(&img, 1, 1);
        assert_eq!(out.pixel(0, 0), [100, 50, 25, 255]);
    }

    #[test]
    fn test_upscale_constant() {
        let img = Raster::filled(3, 2, [40, 80, 120, 255]);
        let out = resize(&img, 9, 7);
        assert_eq!(out, Raster::filled(9, 7, [40, 80, 120, 255]));
    }

    #[test]
    fn test_mask_resize() {
        let m = Mask::filled(8, 8, 255);
        let out = resize_mask(&m, 3, 2);
        assert_eq!(out.dimensions(), (3, 2));
        assert!(out.data().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(4000, 3000, 1024), (1024, 768));
        assert_eq!(fit_within(300, 200, 1024), (300, 200));
        assert_eq!(fit_within(5000, 2, 1000), (1000, 1));
    }
}
