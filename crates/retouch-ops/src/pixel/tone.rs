//! Tone-mapping LUT for shadows, highlights, whites and blacks.
//!
//! Each level `x = i/255` is pushed in order:
//!
//! - shadows: `x += s·(1-x)³·0.5`
//! - highlights: `x += h·x³·0.5`
//! - whites, only for `x > 0.7`: `x += w·((x-0.7)/0.3)·0.2`
//! - blacks, only for `x < 0.3`: `x += b·((0.3-x)/0.3)·0.2`
//!
//! and then clamped to `[0, 1]` and truncated back to a level. The small bias
//! before truncation keeps untouched levels exact under f32 round-off.

const TRUNC_BIAS: f32 = 1e-3;

/// Tonal range controls, each nominally in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ToneParams {
    /// Lift (+) or crush (-) the dark end.
    pub shadows: f32,
    /// Brighten (+) or recover (-) the bright end.
    pub highlights: f32,
    /// Push the top 30% of levels.
    pub whites: f32,
    /// Push the bottom 30% of levels.
    pub blacks: f32,
}

impl ToneParams {
    /// Returns `true` if the LUT would be the identity.
    pub fn is_neutral(&self) -> bool {
        self.shadows == 0.0 && self.highlights == 0.0 && self.whites == 0.0 && self.blacks == 0.0
    }

    /// Builds the 256-entry tone LUT.
    pub fn build_lut(&self) -> [u8; 256] {
        if self.is_neutral() {
            return crate::curve::identity_lut();
        }
        let mut lut = [0u8; 256];
        for (i, out) in lut.iter_mut().enumerate() {
            let mut x = i as f32 / 255.0;
            if self.shadows != 0.0 {
                x += self.shadows * (1.0 - x).powi(3) * 0.5;
            }
            if self.highlights != 0.0 {
                x += self.highlights * x.powi(3) * 0.5;
            }
            if self.whites != 0.0 && x > 0.7 {
                x += self.whites * ((x - 0.7) / 0.3) * 0.2;
            }
            if self.blacks != 0.0 && x < 0.3 {
                x += self.blacks * ((0.3 - x) / 0.3) * 0.2;
            }
            *out = (x.clamp(0.0, 1.0) * 255.0 + TRUNC_BIAS) as u8;
        }
        lut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_is_identity() {
        let lut = ToneParams::default().build_lut();
        assert!(lut.iter().enumerate().all(|(i, &v)| v as usize == i));
    }

    #[test]
    fn test_shadows_lift_dark_end_most() {
        let lut = ToneParams { shadows: 1.0, ..Default::default() }.build_lut();
        // 127.5 truncates
        assert_eq!(lut[0], 127);
        assert_eq!(lut[255], 255);
        assert!(lut[30] - 30 > lut[200] - 200);
    }

    #[test]
    fn test_highlights_negative_darkens_top() {
        let lut = ToneParams { highlights: -1.0, ..Default::default() }.build_lut();
        assert_eq!(lut[0], 0);
        assert_eq!(lut[255], 127);
    }

    #[test]
    fn test_whites_and_blacks_are_range_limited() {
        let lut = ToneParams { whites: 1.0, ..Default::default() }.build_lut();
        assert_eq!(lut[100], 100);
        assert!(lut[230] > 230);

        let lut = ToneParams { blacks: -1.0, ..Default::default() }.build_lut();
        assert_eq!(lut[200], 200);
        assert!(lut[30] < 30);
    }

    #[test]
    fn test_levels_truncate() {
        // level 102 maps to 108.885
        let lut = ToneParams { shadows: 0.25, ..Default::default() }.build_lut();
        assert_eq!(lut[102], 108);
        // untouched levels above the blacks range stay exact
        let lut = ToneParams { blacks: 0.7, ..Default::default() }.build_lut();
        assert!((77..=255).all(|i| lut[i] as usize == i));
    }
}
