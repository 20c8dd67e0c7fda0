//! 4×5 color matrices and the single-pass matrix stage.
//!
//! A [`ColorMatrix`] is 20 floats in row-major order. Row `i` produces
//! channel `i` (R, G, B, A) from the input `[R, G, B, A, 1]`, with the fifth
//! column an offset in 0..255 units:
//!
//! ```text
//! R' = m[0]·R + m[1]·G + m[2]·B + m[3]·A + m[4]
//! G' = m[5]·R + ...
//! ```
//!
//! Matrices compose with [`ColorMatrix::post_concat`]: `a.post_concat(&b)`
//! applies `a` first, then `b`. The stage builds one composed matrix per
//! render and touches every pixel once.
//!
//! # Example
//!
//! ```rust
//! use retouch_ops::color_matrix::ColorMatrix;
//!
//! let m = ColorMatrix::contrast(1.2).post_concat(&ColorMatrix::saturation(0.0));
//! let [r, g, b, a] = m.transform([128, 128, 128, 255]);
//! assert_eq!((r, g, b, a), (128, 128, 128, 255));
//! ```

use rayon::prelude::*;
use retouch_core::alloc::try_filled;
use retouch_core::Raster;
#[allow(unused_imports)]
use tracing::{debug, trace, warn};

/// Luminance weights used by the desaturation matrix.
const SAT_WEIGHTS: [f32; 3] = [0.213, 0.715, 0.072];

/// Row-major 4×5 color matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix(pub [f32; 20]);

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ColorMatrix {
    /// The identity matrix.
    pub const IDENTITY: ColorMatrix = ColorMatrix([
        1.0, 0.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 1.0, 0.0,
    ]);

    /// Per-channel gain.
    pub fn scale(r: f32, g: f32, b: f32, a: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.0[0] = r;
        m.0[6] = g;
        m.0[12] = b;
        m.0[18] = a;
        m
    }

    /// Per-channel offset in 0..255 units.
    pub fn offset(r: f32, g: f32, b: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.0[4] = r;
        m.0[9] = g;
        m.0[14] = b;
        m
    }

    /// Uniform RGB gain plus uniform RGB offset.
    pub fn gain_offset(gain: f32, offset: f32) -> Self {
        Self::scale(gain, gain, gain, 1.0).post_concat(&Self::offset(offset, offset, offset))
    }

    /// Contrast around mid-gray: `scale = c`, `offset = (-0.5·c + 0.5)·255`.
    pub fn contrast(c: f32) -> Self {
        Self::gain_offset(c, (-0.5 * c + 0.5) * 255.0)
    }

    /// Luminance-preserving saturation; 0 is grayscale, 1 is identity.
    pub fn saturation(s: f32) -> Self {
        let inv = 1.0 - s;
        let [r, g, b] = SAT_WEIGHTS.map(|w| w * inv);
        ColorMatrix([
            r + s, g, b, 0.0, 0.0,
            r, g + s, b, 0.0, 0.0,
            r, g, b + s, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ])
    }

    /// Exposure in stops: uniform gain of `2^ev`.
    pub fn exposure(ev: f32) -> Self {
        let gain = 2f32.powf(ev);
        Self::scale(gain, gain, gain, 1.0)
    }

    /// Brightness as a uniform offset of `b·255`.
    pub fn brightness(b: f32) -> Self {
        let t = b * 255.0;
        Self::offset(t, t, t)
    }

    /// Returns the matrix that applies `self` and then `next`.
    pub fn post_concat(&self, next: &ColorMatrix) -> ColorMatrix {
        let a = &self.0;
        let b = &next.0;
        let mut out = [0.0f32; 20];
        for row in 0..4 {
            for col in 0..5 {
                let mut v = 0.0;
                for k in 0..4 {
                    v += b[row * 5 + k] * a[k * 5 + col];
                }
                if col == 4 {
                    v += b[row * 5 + 4];
                }
                out[row * 5 + col] = v;
            }
        }
        ColorMatrix(out)
    }

    /// Interpolates from identity (`t <= 0`) to `self` (`t >= 1`).
    pub fn lerp_identity(&self, t: f32) -> ColorMatrix {
        if t >= 1.0 {
            return *self;
        }
        if t <= 0.0 {
            return Self::IDENTITY;
        }
        let mut out = Self::IDENTITY;
        for (o, &v) in out.0.iter_mut().zip(&self.0) {
            *o += (v - *o) * t;
        }
        out
    }

    /// Returns `true` if this is exactly the identity.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Transforms one RGBA pixel, rounding and clamping each channel.
    #[inline]
    pub fn transform(&self, px: [u8; 4]) -> [u8; 4] {
        let m = &self.0;
        let [r, g, b, a] = px.map(|c| c as f32);
        let ch = |i: usize| {
            let v = m[i] * r + m[i + 1] * g + m[i + 2] * b + m[i + 3] * a + m[i + 4];
            v.round().clamp(0.0, 255.0) as u8
        };
        [ch(0), ch(5), ch(10), ch(15)]
    }

    /// Applies the matrix to every pixel, writing a freshly allocated raster.
    ///
    /// The identity matrix returns a clone sharing the input buffer.
    pub fn apply(&self, src: &Raster) -> Raster {
        if self.is_identity() {
            return src.clone();
        }
        trace!(width = src.width(), height = src.height(), "color matrix");
        let mut data = match try_filled(src.data().len(), 0u8) {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "color matrix skipped");
                return src.clone();
            }
        };
        let stride = src.row_stride().max(1);
        data.par_chunks_mut(stride)
            .zip(src.data().par_chunks(stride))
            .for_each(|(out, row)| {
                for (o, p) in out.chunks_exact_mut(4).zip(row.chunks_exact(4)) {
                    o.copy_from_slice(&self.transform([p[0], p[1], p[2], p[3]]));
                }
            });
        Raster::from_data(src.width(), src.height(), data).unwrap_or_else(|_| src.clone())
    }
}

/// Named looks, each a fixed color matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FilterPreset {
    /// No look.
    #[default]
    None,
    /// Black and white.
    Bw,
    /// Classic sepia tone.
    Sepia,
    /// Faded colors with a yellow cast.
    Vintage,
    /// Golden warm balance.
    Warm,
    /// Blue-leaning balance.
    Cool,
    /// Crushed blacks, punchy mids.
    Cinematic,
    /// Desaturated high contrast.
    Dramatic,
    /// Pink skin tint.
    SkinRosy,
    /// Warm skin.
    SkinGolden,
    /// Slightly muted skin.
    SkinSoft,
    /// Richer, more saturated skin.
    SkinTan,
}

impl FilterPreset {
    /// Every preset, in display order.
    pub const ALL: [FilterPreset; 12] = [
        FilterPreset::None,
        FilterPreset::Bw,
        FilterPreset::Sepia,
        FilterPreset::Vintage,
        FilterPreset::Warm,
        FilterPreset::Cool,
        FilterPreset::Cinematic,
        FilterPreset::Dramatic,
        FilterPreset::SkinRosy,
        FilterPreset::SkinGolden,
        FilterPreset::SkinSoft,
        FilterPreset::SkinTan,
    ];

    /// Short display label.
    pub fn label(self) -> &'static str {
        match self {
            FilterPreset::None => "Original",
            FilterPreset::Bw => "B&W",
            FilterPreset::Sepia => "Sepia",
            FilterPreset::Vintage => "Vintage",
            FilterPreset::Warm => "Golden",
            FilterPreset::Cool => "Cool",
            FilterPreset::Cinematic => "Cine",
            FilterPreset::Dramatic => "Drama",
            FilterPreset::SkinRosy => "Rosy",
            FilterPreset::SkinGolden => "Gold Skin",
            FilterPreset::SkinSoft => "Soft",
            FilterPreset::SkinTan => "Tan",
        }
    }

    /// Full-strength matrix of this preset.
    pub fn matrix(self) -> ColorMatrix {
        match self {
            FilterPreset::None => ColorMatrix::IDENTITY,
            FilterPreset::Bw => ColorMatrix::saturation(0.0),
            FilterPreset::Sepia => ColorMatrix([
                0.393, 0.769, 0.189, 0.0, 0.0,
                0.349, 0.686, 0.168, 0.0, 0.0,
                0.272, 0.534, 0.131, 0.0, 0.0,
                0.0, 0.0, 0.0, 1.0, 0.0,
            ]),
            FilterPreset::Vintage => {
                ColorMatrix::saturation(0.6).post_concat(&ColorMatrix::offset(20.0, 20.0, 0.0))
            }
            FilterPreset::Warm | FilterPreset::SkinGolden => ColorMatrix::scale(1.1, 1.05, 0.9, 1.0),
            FilterPreset::Cool => ColorMatrix::scale(0.9, 1.0, 1.1, 1.0),
            FilterPreset::Cinematic => ColorMatrix::gain_offset(1.2, -20.0),
            FilterPreset::Dramatic => {
                ColorMatrix::saturation(0.8).post_concat(&ColorMatrix::gain_offset(1.4, -50.0))
            }
            FilterPreset::SkinRosy => ColorMatrix::scale(1.05, 0.95, 0.95, 1.0)
                .post_concat(&ColorMatrix::offset(10.0, 0.0, 5.0)),
            FilterPreset::SkinSoft => ColorMatrix::saturation(0.9),
            FilterPreset::SkinTan => ColorMatrix::saturation(1.15),
        }
    }

    /// Preset matrix blended toward identity by `strength` in `[0, 1]`.
    pub fn scaled_matrix(self, strength: f32) -> ColorMatrix {
        self.matrix().lerp_identity(strength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_contrast_mid_gray_fixed_point() {
        let m = ColorMatrix::contrast(1.2);
        assert_eq!(m.transform([128, 128, 128, 255]), [128, 128, 128, 255]);
        // dark gets darker, bright gets brighter
        assert!(m.transform([40, 40, 40, 255])[0] < 40);
        assert!(m.transform([220, 220, 220, 255])[0] > 220);
    }

    #[test]
    fn test_exposure_one_stop() {
        assert_eq!(ColorMatrix::exposure(1.0).transform([50, 100, 200, 255]), [100, 200, 255, 255]);
    }

    #[test]
    fn test_brightness_offset() {
        assert_eq!(ColorMatrix::brightness(0.1).transform([0, 100, 250, 7]), [26, 126, 255, 7]);
    }

    #[test]
    fn test_saturation_zero_is_gray() {
        let [r, g, b, _] = ColorMatrix::saturation(0.0).transform([200, 50, 10, 255]);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn test_post_concat_order() {
        // offset then gain differs from gain then offset
        let a = ColorMatrix::offset(10.0, 10.0, 10.0).post_concat(&ColorMatrix::scale(2.0, 2.0, 2.0, 1.0));
        assert_eq!(a.transform([0, 0, 0, 255])[0], 20);
        let b = ColorMatrix::scale(2.0, 2.0, 2.0, 1.0).post_concat(&ColorMatrix::offset(10.0, 10.0, 10.0));
        assert_eq!(b.transform([0, 0, 0, 255])[0], 10);
    }

    #[test]
    fn test_post_concat_identity() {
        let m = ColorMatrix::saturation(0.7);
        assert_eq!(m.post_concat(&ColorMatrix::IDENTITY), m);
        assert_eq!(ColorMatrix::IDENTITY.post_concat(&m), m);
    }

    #[test]
    fn test_lerp_identity() {
        let m = FilterPreset::Sepia.matrix();
        assert!(m.lerp_identity(0.0).is_identity());
        assert_eq!(m.lerp_identity(1.5), m);
        let half = m.lerp_identity(0.5);
        assert_relative_eq!(half.0[0], (1.0 + 0.393) / 2.0);
        assert_relative_eq!(half.0[1], 0.769 / 2.0);
    }

    #[test]
    fn test_presets() {
        assert!(FilterPreset::None.matrix().is_identity());
        for p in FilterPreset::ALL.iter().skip(1) {
            assert!(!p.matrix().is_identity(), "{:?}", p);
        }
        let vintage = FilterPreset::Vintage.matrix();
        assert_relative_eq!(vintage.0[4], 20.0);
        assert_relative_eq!(vintage.0[14], 0.0);
    }

    #[test]
    fn test_apply_identity_shares_buffer() {
        let img = Raster::filled(3, 3, [1, 2, 3, 255]);
        assert!(ColorMatrix::IDENTITY.apply(&img).ptr_eq(&img));
        let out = ColorMatrix::exposure(1.0).apply(&img);
        assert_eq!(out.pixel(2, 2), [2, 4, 6, 255]);
    }
}
