//! Spatial filters: sharpen, structure, denoise and global blur.
//!
//! Every filter takes an amount in `[0, 1]`. Amounts at or below zero are a
//! no-op and return a clone sharing the input buffer. Alpha is never touched.
//!
//! Sharpen and denoise are 3×3 neighbourhood filters; the one-pixel border
//! keeps its input values. Both read from the untouched input, so rows can be
//! processed in parallel.

use rayon::prelude::*;
use retouch_core::Raster;
#[allow(unused_imports)]
use tracing::{debug, trace};

use crate::blur::{blur_downscaled, stack_blur};

/// Largest global blur radius; wider windows only repeat edge pixels.
const MAX_RADIUS: f32 = 65_536.0;

/// Unsharp 3×3 kernel: center `1 + 4a`, orthogonal neighbours `-a`.
pub fn sharpen(src: &Raster, amount: f32) -> Raster {
    if amount <= 0.0 {
        return src.clone();
    }
    trace!(amount, "sharpen");
    let center = 1.0 + 4.0 * amount;
    neighbourhood(src, |orig, n| {
        let ortho = n[1] + n[3] + n[5] + n[7];
        orig as f32 * center - ortho as f32 * amount
    })
}

/// 3×3 mean blended toward the original by `amount`.
pub fn denoise(src: &Raster, amount: f32) -> Raster {
    if amount <= 0.0 {
        return src.clone();
    }
    trace!(amount, "denoise");
    neighbourhood(src, |orig, n| {
        let mean = n.iter().sum::<i32>() / 9;
        orig as f32 + (mean - orig) as f32 * amount
    })
}

/// Local contrast: boosts the difference between each pixel and a blurred
/// copy with radius `max(5, 0.5% of width)`.
pub fn structure(src: &Raster, amount: f32) -> Raster {
    if amount <= 0.0 || src.is_empty() {
        return src.clone();
    }
    let radius = ((src.width() as f32 * 0.005) as i32).max(5);
    debug!(amount, radius, "structure");

    let mut blurred = src.clone();
    stack_blur(&mut blurred, radius);

    let mut out = src.clone();
    out.data_mut()
        .par_chunks_mut(Raster::CHANNELS)
        .zip(blurred.data().par_chunks(Raster::CHANNELS))
        .for_each(|(px, b)| {
            for c in 0..3 {
                let orig = px[c] as f32;
                px[c] = truncate(orig + (orig - b[c] as f32) * amount);
            }
        });
    out
}

/// Global blur with radius `max(1, amount · 50)`, computed at a long edge of
/// at most `max_edge`.
pub fn blur(src: &Raster, amount: f32, max_edge: u32) -> Raster {
    if amount <= 0.0 {
        return src.clone();
    }
    let radius = ((amount * 50.0).min(MAX_RADIUS) as i32).max(1);
    debug!(amount, radius, max_edge, "global blur");
    blur_downscaled(src, radius, max_edge)
}

/// Runs `kernel(center, neighbourhood)` on each RGB channel of every interior
/// pixel. The neighbourhood is the 3×3 block in row-major order.
fn neighbourhood<F>(src: &Raster, kernel: F) -> Raster
where
    F: Fn(i32, &[i32; 9]) -> f32 + Sync,
{
    let (w, h) = (src.width() as usize, src.height() as usize);
    if w < 3 || h < 3 {
        return src.clone();
    }
    let stride = src.row_stride();
    let input = src.data();
    let mut out = src.clone();

    out.data_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .skip(1)
        .take(h - 2)
        .for_each(|(y, row)| {
            let above = &input[(y - 1) * stride..y * stride];
            let here = &input[y * stride..(y + 1) * stride];
            let below = &input[(y + 1) * stride..(y + 2) * stride];
            for x in 1..w - 1 {
                for c in 0..3 {
                    let at = |r: &[u8], dx: usize| r[(x + dx - 1) * 4 + c] as i32;
                    let n = [
                        at(above, 0), at(above, 1), at(above, 2),
                        at(here, 0), at(here, 1), at(here, 2),
                        at(below, 0), at(below, 1), at(below, 2),
                    ];
                    row[x * 4 + c] = truncate(kernel(n[4], &n));
                }
            }
        });
    out
}

#[inline]
fn truncate(v: f32) -> u8 {
    (v as i32).clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(w: u32, h: u32, bg: u8, fg: u8) -> Raster {
        let mut img = Raster::filled(w, h, [bg, bg, bg, 255]);
        img.set_pixel(w / 2, h / 2, [fg, fg, fg, 255]);
        img
    }

    #[test]
    fn test_zero_amount_shares_buffer() {
        let img = dot(5, 5, 10, 200);
        assert!(sharpen(&img, 0.0).ptr_eq(&img));
        assert!(denoise(&img, -1.0).ptr_eq(&img));
        assert!(structure(&img, 0.0).ptr_eq(&img));
        assert!(blur(&img, 0.0, 1024).ptr_eq(&img));
    }

    #[test]
    fn test_sharpen_kernel() {
        let img = dot(5, 5, 100, 120);
        let out = sharpen(&img, 1.0);
        // 120 * 5 - 4 * 100
        assert_eq!(out.pixel(2, 2)[0], 200);
        // 100 * 5 - 3 * 100 - 120
        assert_eq!(out.pixel(2, 1)[0], 80);
        // diagonal neighbour sees only background
        assert_eq!(out.pixel(1, 1)[0], 100);
    }

    #[test]
    fn test_sharpen_clamps_and_keeps_border() {
        let img = dot(3, 3, 0, 255);
        let out = sharpen(&img, 1.0);
        assert_eq!(out.pixel(1, 1), [255, 255, 255, 255]);
        assert_eq!(out.pixel(0, 1), [0, 0, 0, 255]);
    }

    #[test]
    fn test_denoise_full_amount_is_mean() {
        let img = dot(3, 3, 0, 90);
        let out = denoise(&img, 1.0);
        assert_eq!(out.pixel(1, 1)[0], 10);
        let half = denoise(&img, 0.5);
        assert_eq!(half.pixel(1, 1)[0], 50);
    }

    #[test]
    fn test_uniform_image_unaffected() {
        let img = Raster::filled(6, 6, [77, 88, 99, 120]);
        assert_eq!(sharpen(&img, 0.5), img);
        assert_eq!(denoise(&img, 0.5), img);
        assert_eq!(structure(&img, 0.5), img);
    }

    #[test]
    fn test_tiny_image_passthrough() {
        let img = dot(2, 2, 0, 255);
        assert_eq!(sharpen(&img, 1.0), img);
    }

    #[test]
    fn test_structure_increases_local_contrast() {
        let img = dot(21, 21, 100, 160);
        let out = structure(&img, 1.0);
        assert!(out.pixel(10, 10)[0] > 160);
        assert_eq!(out.pixel(10, 10)[3], 255);
    }

    #[test]
    fn test_blur_spreads_dot() {
        let img = dot(9, 9, 0, 255);
        let out = blur(&img, 0.02, 1024);
        assert!(out.pixel(4, 4)[0] < 255);
        assert!(out.pixel(5, 4)[0] > 0);
    }

    #[test]
    fn test_blur_extreme_amount() {
        let img = Raster::filled(6, 5, [255, 255, 255, 255]);
        for amount in [1.0e6, f32::MAX, f32::INFINITY] {
            assert_eq!(blur(&img, amount, 1024), img);
        }
    }
}
