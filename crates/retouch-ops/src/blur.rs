//! Stack blur: a three-pass separable box blur approximating a Gaussian.
//!
//! RGB is split into three `i32` planes. Each plane gets three rounds of a
//! horizontal then vertical sliding-window box filter with divisor
//! `2·radius + 1`; windows clamp at the image edges. Alpha is left untouched.
//! The three planes are blurred concurrently.
//!
//! Radii below 1 are a no-op.
//!
//! [`blur_downscaled`] is the entry point for large radii on large images: it
//! blurs a copy reduced to a bounded long edge and scales the result back up.
//!
//! # Example
//!
//! ```rust
//! use retouch_core::Raster;
//! use retouch_ops::blur::stack_blur;
//!
//! let mut img = Raster::filled(16, 16, [0, 0, 0, 255]);
//! img.set_pixel(8, 8, [255, 255, 255, 255]);
//! stack_blur(&mut img, 2);
//! assert!(img.pixel(8, 8)[0] < 255);
//! assert!(img.pixel(9, 8)[0] > 0);
//! ```

use rayon::prelude::*;
use retouch_core::alloc::try_filled;
use retouch_core::{Mask, Raster};
#[allow(unused_imports)]
use tracing::{debug, trace, warn};

use crate::resample;

const PASSES: usize = 3;

/// Blurs `raster` in place. Radius < 1 leaves it untouched.
///
/// If the working planes cannot be allocated the raster is left unchanged
/// and a warning is logged.
pub fn stack_blur(raster: &mut Raster, radius: i32) {
    if let Err(e) = try_stack_blur(raster, radius) {
        warn!(error = %e, "stack blur skipped");
    }
}

/// Like [`stack_blur`] but reports allocation failure to the caller.
pub fn try_stack_blur(raster: &mut Raster, radius: i32) -> retouch_core::Result<()> {
    if radius < 1 || raster.is_empty() {
        return Ok(());
    }
    let (w, h) = (raster.width() as usize, raster.height() as usize);
    trace!(width = w, height = h, radius, "stack_blur");

    let len = w * h;
    let mut planes = [try_filled(len, 0i32)?, try_filled(len, 0i32)?, try_filled(len, 0i32)?];
    let mut scratch = [try_filled(len, 0i32)?, try_filled(len, 0i32)?, try_filled(len, 0i32)?];

    for (i, px) in raster.data().chunks_exact(Raster::CHANNELS).enumerate() {
        planes[0][i] = px[0] as i32;
        planes[1][i] = px[1] as i32;
        planes[2][i] = px[2] as i32;
    }

    let r = window_radius(radius, w, h);
    planes
        .par_iter_mut()
        .zip(scratch.par_iter_mut())
        .for_each(|(plane, tmp)| blur_plane(plane, tmp, w, h, r));

    for (i, px) in raster.data_mut().chunks_exact_mut(Raster::CHANNELS).enumerate() {
        px[0] = planes[0][i] as u8;
        px[1] = planes[1][i] as u8;
        px[2] = planes[2][i] as u8;
    }
    Ok(())
}

/// Blurs a mask in place with the same three-pass filter.
pub fn stack_blur_mask(mask: &mut Mask, radius: i32) {
    if radius < 1 || mask.width() == 0 || mask.height() == 0 {
        return;
    }
    let (w, h) = (mask.width() as usize, mask.height() as usize);
    trace!(width = w, height = h, radius, "stack_blur_mask");

    let planes = try_filled(w * h, 0i32).and_then(|p| Ok((p, try_filled(w * h, 0i32)?)));
    let (mut plane, mut tmp) = match planes {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "mask feather skipped");
            return;
        }
    };
    for (dst, &src) in plane.iter_mut().zip(mask.data()) {
        *dst = src as i32;
    }
    blur_plane(&mut plane, &mut tmp, w, h, window_radius(radius, w, h));
    for (dst, &src) in mask.data_mut().iter_mut().zip(&plane) {
        *dst = src as u8;
    }
}

/// Returns a blurred copy of `src`, working at reduced resolution when its
/// long edge exceeds `max_edge`.
///
/// The radius is scaled by the same factor as the image (minimum 1) so the
/// visual blur strength matches a full-resolution blur.
pub fn blur_downscaled(src: &Raster, radius: i32, max_edge: u32) -> Raster {
    if radius < 1 || src.is_empty() {
        return src.clone();
    }
    let long = src.long_edge();
    if max_edge == 0 || long <= max_edge {
        let mut out = src.clone();
        stack_blur(&mut out, radius);
        return out;
    }

    let scale = max_edge as f32 / long as f32;
    let (sw, sh) = resample::fit_within(src.width(), src.height(), max_edge);
    let small_radius = ((radius as f32 * scale).round() as i32).max(1);
    debug!(from = long, to = max_edge, radius, small_radius, "blurring downscaled copy");

    let mut small = resample::resize(src, sw, sh);
    stack_blur(&mut small, small_radius);
    resample::resize(&small, src.width(), src.height())
}

/// Radii past the long edge only repeat clamped edge samples.
fn window_radius(radius: i32, w: usize, h: usize) -> usize {
    (radius.max(0) as usize).min(w.max(h))
}

fn blur_plane(plane: &mut [i32], tmp: &mut [i32], w: usize, h: usize, radius: usize) {
    for _ in 0..PASSES {
        box_horizontal(plane, tmp, w, radius);
        box_vertical(tmp, plane, w, h, radius);
    }
}

/// Sliding-window box filter along each row.
fn box_horizontal(src: &[i32], dst: &mut [i32], w: usize, radius: usize) {
    let div = (2 * radius + 1) as i64;
    let last = w as isize - 1;
    let clamp = |i: isize| i.clamp(0, last) as usize;

    for (row, out) in src.chunks_exact(w).zip(dst.chunks_exact_mut(w)) {
        let r = radius as isize;
        let mut sum: i64 = (-r..=r).map(|i| row[clamp(i)] as i64).sum();
        for x in 0..w {
            out[x] = (sum / div) as i32;
            let xi = x as isize;
            sum -= row[clamp(xi - r)] as i64;
            sum += row[clamp(xi + r + 1)] as i64;
        }
    }
}

/// Sliding-window box filter down each column, swept row by row with one
/// running sum per column.
fn box_vertical(src: &[i32], dst: &mut [i32], w: usize, h: usize, radius: usize) {
    let div = (2 * radius + 1) as i64;
    let r = radius as isize;

    let mut sums = vec![0i64; w];
    for i in -r..=r {
        for (s, &v) in sums.iter_mut().zip(clamped_row(src, w, h, i)) {
            *s += v as i64;
        }
    }

    for (y, out) in dst.chunks_exact_mut(w).enumerate() {
        for (o, &s) in out.iter_mut().zip(&sums) {
            *o = (s / div) as i32;
        }
        let yi = y as isize;
        let leaving = clamped_row(src, w, h, yi - r);
        let entering = clamped_row(src, w, h, yi + r + 1);
        for ((s, &a), &b) in sums.iter_mut().zip(leaving).zip(entering) {
            *s += (b - a) as i64;
        }
    }
}

#[inline]
fn clamped_row(src: &[i32], w: usize, h: usize, i: isize) -> &[i32] {
    let y = i.clamp(0, h as isize - 1) as usize;
    &src[y * w..(y + 1) * w]
}
