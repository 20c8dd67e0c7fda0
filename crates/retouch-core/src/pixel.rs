//! Per-pixel helpers: luma weights, ARGB packing and HSV conversion.

/// Rec.709 luma of an 8-bit RGB triple, truncated to an integer level.
///
/// ```rust
/// use retouch_core::luma_rec709;
///
/// assert_eq!(luma_rec709(255, 255, 255), 255);
/// assert_eq!(luma_rec709(0, 0, 0), 0);
/// ```
#[inline]
pub fn luma_rec709(r: u8, g: u8, b: u8) -> u8 {
    // exact decimal weights in fixed point so white stays 255
    ((2126 * r as u32 + 7152 * g as u32 + 722 * b as u32) / 10_000) as u8
}

/// Fixed-point luma `(77r + 150g + 29b) >> 8`.
///
/// The weights sum to 256 so white maps to 255.
#[inline]
pub fn luma_fixed(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32) >> 8) as u8
}

/// Packs `[r, g, b, a]` into `0xAARRGGBB`.
#[inline]
pub fn pack_argb(rgba: [u8; 4]) -> u32 {
    let [r, g, b, a] = rgba;
    (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Unpacks `0xAARRGGBB` into `[r, g, b, a]`.
#[inline]
pub fn unpack_argb(argb: u32) -> [u8; 4] {
    [
        (argb >> 16) as u8,
        (argb >> 8) as u8,
        argb as u8,
        (argb >> 24) as u8,
    ]
}

/// Clamps a float channel to `0..=255` and rounds it.
#[inline]
pub fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Converts 8-bit RGB to HSV with hue in degrees `[0, 360)` and s, v in `[0, 1]`.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [f32; 3] {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta <= 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max <= 0.0 { 0.0 } else { delta / max };
    [h.rem_euclid(360.0), s, max]
}

/// Converts HSV (hue in degrees) back to 8-bit RGB, rounding each channel.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
    let h = h.rem_euclid(360.0);
    let s = s.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [
        clamp_u8((r + m) * 255.0),
        clamp_u8((g + m) * 255.0),
        clamp_u8((b + m) * 255.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_luma_fixed_white() {
        assert_eq!(luma_fixed(255, 255, 255), 255);
        assert_eq!(luma_fixed(0, 0, 0), 0);
    }

    #[test]
    fn test_pack_unpack() {
        let rgba = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(pack_argb(rgba), 0x78123456);
        assert_eq!(unpack_argb(0x78123456), rgba);
    }

    #[test]
    fn test_hsv_primaries() {
        let [h, s, v] = rgb_to_hsv(255, 0, 0);
        assert_relative_eq!(h, 0.0);
        assert_relative_eq!(s, 1.0);
        assert_relative_eq!(v, 1.0);

        let [h, _, _] = rgb_to_hsv(0, 0, 255);
        assert_relative_eq!(h, 240.0);
    }

    #[test]
    fn test_hsv_round_trip() {
        for &(r, g, b) in &[(200u8, 120u8, 40u8), (10, 250, 90), (128, 128, 128), (0, 0, 0)] {
            let [h, s, v] = rgb_to_hsv(r, g, b);
            assert_eq!(hsv_to_rgb(h, s, v), [r, g, b]);
        }
    }
}
