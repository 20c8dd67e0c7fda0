//! Eight-sector HSL adjustments.
//!
//! The hue wheel is split into eight named sectors. A pixel's hue falls
//! between two neighbouring sector anchors and takes a linear blend of their
//! shifts:
//!
//! ```text
//!   0..30  red -> orange        180..240 aqua -> blue
//!  30..60  orange -> yellow     240..280 blue -> purple
//!  60..120 yellow -> green      280..315 purple -> magenta
//! 120..180 green -> aqua        315..360 magenta -> red
//! ```
//!
//! The blended hue shift is added (mod 360); saturation and value are
//! scaled by `1 + Σ shift·weight` and clamped.

use retouch_core::pixel::{hsv_to_rgb, rgb_to_hsv};
use std::collections::BTreeMap;

/// Named hue sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HslSector {
    /// Reds, anchored at 0°.
    Red,
    /// Oranges, anchored at 30°.
    Orange,
    /// Yellows, anchored at 60°.
    Yellow,
    /// Greens, anchored at 120°.
    Green,
    /// Aquas, anchored at 180°.
    Aqua,
    /// Blues, anchored at 240°.
    Blue,
    /// Purples, anchored at 280°.
    Purple,
    /// Magentas, anchored at 315°.
    Magenta,
}

impl HslSector {
    /// All sectors in hue order.
    pub const ALL: [HslSector; 8] = [
        HslSector::Red,
        HslSector::Orange,
        HslSector::Yellow,
        HslSector::Green,
        HslSector::Aqua,
        HslSector::Blue,
        HslSector::Purple,
        HslSector::Magenta,
    ];

    /// Hue where this sector has full weight.
    pub fn anchor(self) -> f32 {
        match self {
            HslSector::Red => 0.0,
            HslSector::Orange => 30.0,
            HslSector::Yellow => 60.0,
            HslSector::Green => 120.0,
            HslSector::Aqua => 180.0,
            HslSector::Blue => 240.0,
            HslSector::Purple => 280.0,
            HslSector::Magenta => 315.0,
        }
    }

    /// The two sectors surrounding `hue` and the weight `t` of the second.
    pub fn bracket(hue: f32) -> (HslSector, HslSector, f32) {
        let hue = hue.rem_euclid(360.0);
        let i = Self::ALL
            .iter()
            .rposition(|s| hue >= s.anchor())
            .unwrap_or(0);
        let lo = Self::ALL[i];
        let hi = Self::ALL[(i + 1) % Self::ALL.len()];
        let end = if i + 1 == Self::ALL.len() { 360.0 } else { hi.anchor() };
        (lo, hi, (hue - lo.anchor()) / (end - lo.anchor()))
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Hue/saturation/luminance shift for one sector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct HslShift {
    /// Hue rotation in degrees.
    pub hue: f32,
    /// Relative saturation change; `-1` removes all saturation.
    pub saturation: f32,
    /// Relative brightness change.
    pub luminance: f32,
}

impl HslShift {
    /// Returns `true` if the shift does nothing.
    pub fn is_zero(&self) -> bool {
        self.hue == 0.0 && self.saturation == 0.0 && self.luminance == 0.0
    }
}

/// Dense per-sector lookup built once per render.
#[derive(Debug, Clone, PartialEq)]
pub struct HslTable {
    shifts: [Option<HslShift>; 8],
}

impl HslTable {
    /// Builds the table; `None` when no sector has a non-zero shift.
    pub fn new(map: &BTreeMap<HslSector, HslShift>) -> Option<Self> {
        let mut shifts = [None; 8];
        for (sector, shift) in map {
            if !shift.is_zero() {
                shifts[sector.index()] = Some(*shift);
            }
        }
        shifts.iter().any(Option::is_some).then_some(Self { shifts })
    }

    /// Applies the blended shift to one RGB triple.
    pub fn apply(&self, r: u8, g: u8, b: u8) -> [u8; 3] {
        let [h, s, v] = rgb_to_hsv(r, g, b);
        let (lo, hi, t) = HslSector::bracket(h);

        let mut hue_shift = 0.0;
        let mut sat_scale = 1.0;
        let mut lum_scale = 1.0;
        for (sector, w) in [(lo, 1.0 - t), (hi, t)] {
            if let Some(shift) = self.shifts[sector.index()] {
                hue_shift += shift.hue * w;
                sat_scale += shift.saturation * w;
                lum_scale += shift.luminance * w;
            }
        }
        if hue_shift == 0.0 && sat_scale == 1.0 && lum_scale == 1.0 {
            return [r, g, b];
        }
        hsv_to_rgb(
            (h + hue_shift).rem_euclid(360.0),
            (s * sat_scale).clamp(0.0, 1.0),
            (v * lum_scale).clamp(0.0, 1.0),
        )
    }
}
