//! The adjustment model: one complete, immutable edit state.
//!
//! [`Adjustments`] is a plain value. Edits produce a new value with struct
//! update syntax and equality is structural, which is what the edit history
//! relies on to skip no-op commits.
//!
//! Each pipeline stage reads its own slice of the model through one of the
//! projection methods ([`geometry`](Adjustments::geometry),
//! [`color_matrix`](Adjustments::color_matrix),
//! [`pixel_params`](Adjustments::pixel_params)).
//!
//! Adjustments serialize to RON; missing fields take their defaults:
//!
//! ```rust
//! use retouch_render::Adjustments;
//!
//! let adj = Adjustments::from_ron_str("(exposure: 0.5, contrast: 1.2)").unwrap();
//! assert_eq!(adj.exposure, 0.5);
//! assert_eq!(adj.saturation, 1.0);
//! assert!(!adj.is_default());
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use retouch_core::NormRect;
use retouch_ops::{
    BackgroundMode, ColorMatrix, FilterPreset, GeometryParams, HslSector, HslShift, PixelParams,
    ToneCurve,
};
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};

/// Complete parameter set of one edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjustments {
    /// Exposure in stops.
    pub exposure: f32,
    /// Additive brightness, `[-1, 1]`.
    pub brightness: f32,
    /// Contrast multiplier around mid-gray; 1 is neutral.
    pub contrast: f32,
    /// Highlight push, `[-1, 1]`.
    pub highlights: f32,
    /// Shadow lift, `[-1, 1]`.
    pub shadows: f32,
    /// White point push, `[-1, 1]`.
    pub whites: f32,
    /// Black point push, `[-1, 1]`.
    pub blacks: f32,
    /// Saturation multiplier; 1 is neutral.
    pub saturation: f32,
    /// Saturation boost for muted colors.
    pub vibrance: f32,
    /// Warm/cool balance.
    pub temperature: f32,
    /// Green/magenta balance.
    pub tint: f32,
    /// Skin contrast.
    pub skin_tone: f32,
    /// Skin brightness.
    pub skin_color: f32,
    /// Local contrast ("structure").
    pub clarity: f32,
    /// Sharpening amount, `[0, 1]`.
    pub sharpen: f32,
    /// Vignette amount, `[0, 1]`.
    pub vignette: f32,
    /// Noise reduction amount, `[0, 1]`.
    pub denoise: f32,
    /// Global blur amount, `[0, 1]`.
    pub blur: f32,
    /// Haze removal.
    pub dehaze: f32,
    /// Coarse rotation in degrees.
    pub rotation: f32,
    /// Fine rotation in degrees.
    pub straighten: f32,
    /// Mirror left/right.
    pub flip_horizontal: bool,
    /// Mirror top/bottom.
    pub flip_vertical: bool,
    /// Look preset.
    pub filter: FilterPreset,
    /// Preset strength, `[0, 1]`.
    pub filter_strength: f32,
    /// Normalized crop; `None` keeps the full frame.
    pub crop: Option<NormRect>,
    /// Per-sector HSL shifts; absent sectors are unshifted.
    pub hsl: BTreeMap<HslSector, HslShift>,
    /// Master RGB curve.
    pub curve_rgb: ToneCurve,
    /// Red curve.
    pub curve_red: ToneCurve,
    /// Green curve.
    pub curve_green: ToneCurve,
    /// Blue curve.
    pub curve_blue: ToneCurve,
    /// Luminance curve.
    pub curve_luminance: ToneCurve,
    /// Background effect.
    pub background_mode: BackgroundMode,
    /// Blur radius for [`BackgroundMode::Blur`], in pixels.
    pub background_blur_radius: f32,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            exposure: 0.0,
            brightness: 0.0,
            contrast: 1.0,
            highlights: 0.0,
            shadows: 0.0,
            whites: 0.0,
            blacks: 0.0,
            saturation: 1.0,
            vibrance: 0.0,
            temperature: 0.0,
            tint: 0.0,
            skin_tone: 0.0,
            skin_color: 0.0,
            clarity: 0.0,
            sharpen: 0.0,
            vignette: 0.0,
            denoise: 0.0,
            blur: 0.0,
            dehaze: 0.0,
            rotation: 0.0,
            straighten: 0.0,
            flip_horizontal: false,
            flip_vertical: false,
            filter: FilterPreset::None,
            filter_strength: 1.0,
            crop: None,
            hsl: BTreeMap::new(),
            curve_rgb: ToneCurve::identity(),
            curve_red: ToneCurve::identity(),
            curve_green: ToneCurve::identity(),
            curve_blue: ToneCurve::identity(),
            curve_luminance: ToneCurve::identity(),
            background_mode: BackgroundMode::None,
            background_blur_radius: 25.0,
        }
    }
}

impl Adjustments {
    /// Returns `true` if every field holds its default.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Geometry slice.
    pub fn geometry(&self) -> GeometryParams {
        GeometryParams {
            rotation: self.rotation,
            straighten: self.straighten,
            flip_horizontal: self.flip_horizontal,
            flip_vertical: self.flip_vertical,
            crop: self.crop,
        }
    }

    /// Composed color matrix: preset, contrast, saturation, exposure, brightness.
    pub fn color_matrix(&self) -> ColorMatrix {
        let mut m = self.filter.scaled_matrix(self.filter_strength);
        if self.contrast != 1.0 {
            m = m.post_concat(&ColorMatrix::contrast(self.contrast));
        }
        if self.saturation != 1.0 {
            m = m.post_concat(&ColorMatrix::saturation(self.saturation));
        }
        if self.exposure != 0.0 {
            m = m.post_concat(&ColorMatrix::exposure(self.exposure));
        }
        if self.brightness != 0.0 {
            m = m.post_concat(&ColorMatrix::brightness(self.brightness));
        }
        m
    }

    /// Pixel engine slice.
    pub fn pixel_params(&self) -> PixelParams {
        PixelParams {
            shadows: self.shadows,
            highlights: self.highlights,
            whites: self.whites,
            blacks: self.blacks,
            vibrance: self.vibrance,
            temperature: self.temperature,
            tint: self.tint,
            skin_tone: self.skin_tone,
            skin_color: self.skin_color,
            dehaze: self.dehaze,
            vignette: self.vignette,
            hsl: self.hsl.clone(),
            curve_rgb: self.curve_rgb.clone(),
            curve_red: self.curve_red.clone(),
            curve_green: self.curve_green.clone(),
            curve_blue: self.curve_blue.clone(),
            curve_luminance: self.curve_luminance.clone(),
        }
    }

    /// Returns `true` if any spatial filter is active.
    pub fn has_spatial(&self) -> bool {
        self.sharpen > 0.0 || self.clarity > 0.0 || self.blur > 0.0 || self.denoise > 0.0
    }

    /// Parses adjustments from RON text.
    ///
    /// Curves are validated while parsing, so unsorted duplicates or
    /// out-of-range points are rejected here.
    pub fn from_ron_str(text: &str) -> RenderResult<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Loads adjustments from a RON file.
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| RenderError::io(path, e))?;
        Self::from_ron_str(&text)
    }

    /// Pretty-printed RON.
    pub fn to_ron_string(&self) -> RenderResult<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }
}
