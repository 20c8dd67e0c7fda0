//! Geometry stage: rotate, straighten, flip, crop and preview scaling.
//!
//! All steps are folded into one affine map from output pixels back to
//! source coordinates, so the source is resampled exactly once:
//!
//! 1. rotation and straighten add up to one angle (degrees, clockwise)
//! 2. with a non-zero straighten the frame keeps the size of the coarse
//!    rotation alone and the image is zoomed by [`auto_zoom_scale`] so no
//!    empty corners show; otherwise the frame is the rotated bounding box
//! 3. flips mirror the rotated frame
//! 4. the normalized crop selects a pixel rect of that frame (min 1×1)
//! 5. a preview bound shrinks the crop proportionally, never enlarges it
//!
//! Rotations by multiples of 90°, flips and crops map pixels one to one and
//! are copied without interpolation. Everything else is sampled bilinearly at
//! pixel centers; area outside the source becomes transparent.
//!
//! # Example
//!
//! ```rust
//! use retouch_core::Raster;
//! use retouch_ops::geometry::{GeometryParams, GeometryPlan};
//!
//! let img = Raster::new(400, 300);
//! let params = GeometryParams { rotation: 90.0, ..Default::default() };
//! let plan = GeometryPlan::new(img.width(), img.height(), &params, None);
//! assert_eq!(plan.output_size(), (300, 400));
//! ```

use rayon::prelude::*;
use retouch_core::alloc::try_filled;
use retouch_core::{Mask, NormRect, Raster, Rect};
#[allow(unused_imports)]
use tracing::{debug, trace, warn};

/// Geometry part of an edit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeometryParams {
    /// Coarse rotation in degrees (usually a multiple of 90).
    pub rotation: f32,
    /// Fine rotation in degrees, compensated by auto-zoom.
    pub straighten: f32,
    /// Mirror left/right.
    pub flip_horizontal: bool,
    /// Mirror top/bottom.
    pub flip_vertical: bool,
    /// Crop in the rotated frame; `None` keeps the full frame.
    pub crop: Option<NormRect>,
}

impl GeometryParams {
    /// Returns `true` if these parameters leave the image untouched.
    pub fn is_identity(&self) -> bool {
        (self.rotation + self.straighten).rem_euclid(360.0) == 0.0
            && self.straighten == 0.0
            && !self.flip_horizontal
            && !self.flip_vertical
            && self.crop.is_none_or(|c| c.is_full())
    }
}

/// Zoom factor that hides the empty corners left by rotating a
/// `width × height` image by `degrees`.
///
/// `cos|θ| + sin|θ| · max(w/h, h/w)`. Degenerate sizes return 1.
///
/// ```rust
/// use retouch_ops::geometry::auto_zoom_scale;
///
/// assert_eq!(auto_zoom_scale(100, 100, 0.0), 1.0);
/// assert!(auto_zoom_scale(400, 300, 5.0) > 1.0);
/// ```
pub fn auto_zoom_scale(width: u32, height: u32, degrees: f32) -> f32 {
    if width == 0 || height == 0 {
        return 1.0;
    }
    let rad = (degrees.abs() as f64).to_radians();
    let (w, h) = (width as f64, height as f64);
    let aspect = (w / h).max(h / w);
    (rad.cos() + rad.sin() * aspect) as f32
}

/// 2D affine map `x' = a·x + b·y + tx`, `y' = c·x + d·y + ty`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Affine {
    a: f64,
    b: f64,
    tx: f64,
    c: f64,
    d: f64,
    ty: f64,
}

impl Affine {
    fn translate(tx: f64, ty: f64) -> Self {
        Self { a: 1.0, b: 0.0, tx, c: 0.0, d: 1.0, ty }
    }

    fn scale(sx: f64, sy: f64) -> Self {
        Self { a: sx, b: 0.0, tx: 0.0, c: 0.0, d: sy, ty: 0.0 }
    }

    fn rotate(sin: f64, cos: f64) -> Self {
        Self { a: cos, b: -sin, tx: 0.0, c: sin, d: cos, ty: 0.0 }
    }

    /// `self` followed by `next`.
    fn then(self, next: Affine) -> Self {
        Self {
            a: next.a * self.a + next.b * self.c,
            b: next.a * self.b + next.b * self.d,
            tx: next.a * self.tx + next.b * self.ty + next.tx,
            c: next.c * self.a + next.d * self.c,
            d: next.c * self.b + next.d * self.d,
            ty: next.c * self.tx + next.d * self.ty + next.ty,
        }
    }

    #[inline]
    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.a * x + self.b * y + self.tx, self.c * x + self.d * y + self.ty)
    }
}

/// Resolved geometry for one source size, ready to apply to rasters and masks.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryPlan {
    src_size: (u32, u32),
    out_size: (u32, u32),
    /// Output pixel index -> continuous source coordinates (centers at +0.5).
    inverse: Affine,
    identity: bool,
    one_to_one: bool,
}

impl GeometryPlan {
    /// Resolves `params` for a `src_w × src_h` source, optionally bounded by
    /// a preview box `(width, height)`.
    pub fn new(src_w: u32, src_h: u32, params: &GeometryParams, preview: Option<(u32, u32)>) -> Self {
        let (w, h) = (src_w.max(1) as f64, src_h.max(1) as f64);
        let angle = (params.rotation + params.straighten) as f64;
        let (sin, cos) = snapped_sin_cos(angle);

        let (frame_w, frame_h, zoom) = if params.straighten != 0.0 {
            let (fw, fh) = bounding_box(w, h, params.rotation as f64);
            // past ±90° the formula drops below 1 and would shrink the frame
            let zoom = auto_zoom_scale(src_w, src_h, params.straighten).max(1.0);
            (fw, fh, zoom as f64)
        } else {
            let (fw, fh) = bounding_box(w, h, angle);
            (fw, fh, 1.0)
        };

        let crop = params
            .crop
            .unwrap_or(NormRect::FULL)
            .to_pixels(frame_w, frame_h);
        let scale = preview_scale(&crop, preview);
        let out_w = ((crop.width as f64 * scale).round() as u32).max(1);
        let out_h = ((crop.height as f64 * scale).round() as u32).max(1);

        let fx = if params.flip_horizontal { -1.0 } else { 1.0 };
        let fy = if params.flip_vertical { -1.0 } else { 1.0 };
        let inverse = Affine::translate(0.5, 0.5)
            .then(Affine::scale(crop.width as f64 / out_w as f64, crop.height as f64 / out_h as f64))
            .then(Affine::translate(crop.x as f64, crop.y as f64))
            .then(Affine::translate(-(frame_w as f64) / 2.0, -(frame_h as f64) / 2.0))
            .then(Affine::scale(fx / zoom, fy / zoom))
            .then(Affine::rotate(-sin, cos))
            .then(Affine::translate(w / 2.0, h / 2.0));

        let axis_aligned = sin.fract() == 0.0 && cos.fract() == 0.0;
        let one_to_one = axis_aligned && zoom == 1.0 && (out_w, out_h) == (crop.width, crop.height);
        let identity = params.is_identity() && (out_w, out_h) == (src_w, src_h);

        trace!(src_w, src_h, out_w, out_h, angle, zoom, scale, identity, "geometry plan");
        Self {
            src_size: (src_w, src_h),
            out_size: (out_w, out_h),
            inverse,
            identity,
            one_to_one,
        }
    }

    /// Size of the transformed image.
    pub fn output_size(&self) -> (u32, u32) {
        self.out_size
    }

    /// Returns `true` if applying the plan returns the source unchanged.
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Transforms a raster. Identity plans return a clone sharing the buffer.
    pub fn apply(&self, src: &Raster) -> Raster {
        if self.identity || src.is_empty() {
            return src.clone();
        }
        let (ow, oh) = self.out_size;
        let mut data = match try_filled(ow as usize * oh as usize * Raster::CHANNELS, 0u8) {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "geometry skipped");
                return src.clone();
            }
        };
        let map = self.source_map(src.width(), src.height());
        let (sw, sh) = (src.width() as usize, src.height() as usize);
        let pixels = src.data();
        let one_to_one = self.one_to_one;

        data.par_chunks_mut(ow as usize * Raster::CHANNELS)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.chunks_exact_mut(Raster::CHANNELS).enumerate() {
                    let (sx, sy) = map.apply(x as f64, y as f64);
                    let px = if one_to_one {
                        nearest(pixels, sw, sh, Raster::CHANNELS, sx, sy).map_or([0; 4], |i| {
                            [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
                        })
                    } else {
                        bilinear_rgba(pixels, sw, sh, sx, sy)
                    };
                    out.copy_from_slice(&px);
                }
            });

        Raster::from_data(ow, oh, data).unwrap_or_else(|_| src.clone())
    }

    /// Transforms a mask describing the same source.
    ///
    /// The mask may be smaller than the source; it is stretched to the
    /// source frame first. Area outside the source becomes 0.
    pub fn apply_mask(&self, mask: &Mask) -> Mask {
        let (ow, oh) = self.out_size;
        if self.identity && mask.dimensions() == self.src_size {
            return mask.clone();
        }
        let (mw, mh) = (mask.width() as usize, mask.height() as usize);
        if mw == 0 || mh == 0 {
            return Mask::new(ow, oh);
        }
        let map = self.source_map(mask.width(), mask.height());
        let values = mask.data();
        let one_to_one = self.one_to_one && mask.dimensions() == self.src_size;

        let mut data = match try_filled(ow as usize * oh as usize, 0u8) {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "mask geometry skipped");
                return mask.clone();
            }
        };
        data.par_chunks_mut(ow as usize).enumerate().for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let (sx, sy) = map.apply(x as f64, y as f64);
                *out = if one_to_one {
                    nearest(values, mw, mh, 1, sx, sy).map_or(0, |i| values[i])
                } else {
                    bilinear_alpha(values, mw, mh, sx, sy)
                };
            }
        });
        Mask::from_data(ow, oh, data).unwrap_or_else(|_| Mask::new(ow, oh))
    }

    /// Output pixel index -> sample index space of a `tw × th` buffer
    /// covering the source frame.
    fn source_map(&self, tw: u32, th: u32) -> Affine {
        let kx = tw as f64 / self.src_size.0.max(1) as f64;
        let ky = th as f64 / self.src_size.1.max(1) as f64;
        self.inverse
            .then(Affine::scale(kx, ky))
            .then(Affine::translate(-0.5, -0.5))
    }
}

fn snapped_sin_cos(degrees: f64) -> (f64, f64) {
    let (s, c) = degrees.to_radians().sin_cos();
    let snap = |v: f64| {
        let r = v.round();
        if (v - r).abs() < 1e-9 { r } else { v }
    };
    (snap(s), snap(c))
}

fn bounding_box(w: f64, h: f64, degrees: f64) -> (u32, u32) {
    let (s, c) = snapped_sin_cos(degrees);
    let bw = (w * c.abs() + h * s.abs()).round().max(1.0);
    let bh = (w * s.abs() + h * c.abs()).round().max(1.0);
    (bw as u32, bh as u32)
}

fn preview_scale(crop: &Rect, preview: Option<(u32, u32)>) -> f64 {
    match preview {
        Some((pw, ph)) if pw > 0 && ph > 0 => {
            let target = pw.max(ph) as f64;
            let long = crop.width.max(crop.height) as f64;
            if long > target { target / long } else { 1.0 }
        }
        _ => 1.0,
    }
}

#[inline]
fn nearest(data: &[u8], w: usize, h: usize, channels: usize, sx: f64, sy: f64) -> Option<usize> {
    let (x, y) = (sx.round(), sy.round());
    if x < 0.0 || y < 0.0 || x >= w as f64 || y >= h as f64 {
        return None;
    }
    let i = (y as usize * w + x as usize) * channels;
    (i + channels <= data.len()).then_some(i)
}

/// Neighbour indices and weights of a bilinear tap.
///
/// `None` when the sample point lies outside the buffer; points inside but
/// within half a pixel of the border reuse the edge pixels.
#[inline]
fn bilinear_taps(w: usize, h: usize, sx: f64, sy: f64) -> Option<[(usize, f64); 4]> {
    const EPS: f64 = 1e-6;
    if sx < -0.5 - EPS || sy < -0.5 - EPS || sx > w as f64 - 0.5 + EPS || sy > h as f64 - 0.5 + EPS {
        return None;
    }
    let x0 = sx.floor();
    let y0 = sy.floor();
    let fx = sx - x0;
    let fy = sy - y0;
    let cx = |x: f64| x.clamp(0.0, (w - 1) as f64) as usize;
    let cy = |y: f64| y.clamp(0.0, (h - 1) as f64) as usize;
    let (xa, xb, ya, yb) = (cx(x0), cx(x0 + 1.0), cy(y0), cy(y0 + 1.0));
    Some([
        (ya * w + xa, (1.0 - fx) * (1.0 - fy)),
        (ya * w + xb, fx * (1.0 - fy)),
        (yb * w + xa, (1.0 - fx) * fy),
        (yb * w + xb, fx * fy),
    ])
}

/// Premultiplied bilinear sample; transparent outside the buffer.
fn bilinear_rgba(data: &[u8], w: usize, h: usize, sx: f64, sy: f64) -> [u8; 4] {
    let Some(taps) = bilinear_taps(w, h, sx, sy) else {
        return [0; 4];
    };
    let mut acc = [0.0f64; 4];
    for (i, weight) in taps {
        if weight <= 0.0 {
            continue;
        }
        let p = &data[i * 4..i * 4 + 4];
        let wa = weight * p[3] as f64;
        acc[0] += wa * p[0] as f64;
        acc[1] += wa * p[1] as f64;
        acc[2] += wa * p[2] as f64;
        acc[3] += wa;
    }
    if acc[3] <= 0.0 {
        return [0; 4];
    }
    let unpremul = |v: f64| (v / acc[3]).round().clamp(0.0, 255.0) as u8;
    [
        unpremul(acc[0]),
        unpremul(acc[1]),
        unpremul(acc[2]),
        acc[3].round().clamp(0.0, 255.0) as u8,
    ]
}

fn bilinear_alpha(data: &[u8], w: usize, h: usize, sx: f64, sy: f64) -> u8 {
    let Some(taps) = bilinear_taps(w, h, sx, sy) else {
        return 0;
    };
    let v: f64 = taps.iter().map(|&(i, weight)| weight * data[i] as f64).sum();
    v.round().clamp(0.0, 255.0) as u8
}
