//! Tone curves and their 256-entry lookup tables.
//!
//! A [`ToneCurve`] is a short list of `(x, y)` control points in `[0, 1]²`.
//! [`ToneCurve::build_lut`] bakes it into a `[u8; 256]` table through a
//! monotone cubic Hermite spline:
//!
//! 1. points are scaled to `0..=255`
//! 2. secant slopes `Δ[k]` are taken between neighbours
//! 3. tangents are the mean of the adjacent secants (endpoints use their only secant)
//! 4. Fritsch–Carlson limiting: a flat segment zeroes both tangents, otherwise
//!    `α = m[k]/Δ[k]`, `β = m[k+1]/Δ[k]` are rescaled by `3/√(α²+β²)` whenever
//!    `α² + β² > 9`
//! 5. each level is evaluated with the Hermite basis and clamped
//!
//! Levels outside the first/last control point take that endpoint's `y`.
//!
//! # Example
//!
//! ```rust
//! use retouch_ops::curve::ToneCurve;
//!
//! let lut = ToneCurve::identity().build_lut();
//! assert!(lut.iter().enumerate().all(|(i, &v)| v as usize == i));
//!
//! let darken = ToneCurve::from_pairs(&[(0.0, 0.0), (0.5, 0.25), (1.0, 1.0)]).unwrap();
//! assert!(darken.build_lut()[127] < 127);
//! ```

use crate::{OpsError, OpsResult};

/// A single control point on a tone curve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CurvePoint {
    /// Input level in `[0, 1]`.
    pub x: f32,
    /// Output level in `[0, 1]`.
    pub y: f32,
}

impl CurvePoint {
    /// Creates a control point.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Validated control-point list, sorted by `x` with unique `x` values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "Vec<CurvePoint>", into = "Vec<CurvePoint>")
)]
pub struct ToneCurve {
    points: Vec<CurvePoint>,
}

impl ToneCurve {
    /// The two-point identity curve `(0,0), (1,1)`.
    pub fn identity() -> Self {
        Self {
            points: vec![CurvePoint::new(0.0, 0.0), CurvePoint::new(1.0, 1.0)],
        }
    }

    /// Builds a curve from control points, sorting them by `x`.
    ///
    /// # Errors
    ///
    /// [`OpsError::InvalidParameter`] if there are fewer than two points, a
    /// coordinate is outside `[0, 1]` or not finite, or two points share an `x`.
    pub fn new(mut points: Vec<CurvePoint>) -> OpsResult<Self> {
        if points.len() < 2 {
            return Err(OpsError::InvalidParameter(format!(
                "curve needs at least 2 control points, got {}",
                points.len()
            )));
        }
        let in_range = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
        if let Some(p) = points.iter().find(|p| !in_range(p.x) || !in_range(p.y)) {
            return Err(OpsError::InvalidParameter(format!(
                "curve point ({}, {}) outside [0, 1]",
                p.x, p.y
            )));
        }
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
        if let Some(w) = points.windows(2).find(|w| w[0].x == w[1].x) {
            return Err(OpsError::InvalidParameter(format!(
                "duplicate curve x value {}",
                w[0].x
            )));
        }
        Ok(Self { points })
    }

    /// Convenience constructor from `(x, y)` pairs.
    pub fn from_pairs(pairs: &[(f32, f32)]) -> OpsResult<Self> {
        Self::new(pairs.iter().map(|&(x, y)| CurvePoint::new(x, y)).collect())
    }

    /// Control points, sorted by `x`.
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Returns `true` if every control point lies on `y = x`.
    pub fn is_identity(&self) -> bool {
        self.points.iter().all(|p| (p.x - p.y).abs() < 1e-6)
    }

    /// Bakes the curve into a 256-entry lookup table.
    pub fn build_lut(&self) -> [u8; 256] {
        if self.is_identity() {
            return identity_lut();
        }

        let xs: Vec<f32> = self.points.iter().map(|p| p.x * 255.0).collect();
        let ys: Vec<f32> = self.points.iter().map(|p| p.y * 255.0).collect();
        let tangents = monotone_tangents(&xs, &ys);
        let n = xs.len();

        let mut lut = [0u8; 256];
        let mut seg = 0;
        for (level, out) in lut.iter_mut().enumerate() {
            let x = level as f32;
            let y = if x <= xs[0] {
                ys[0]
            } else if x >= xs[n - 1] {
                ys[n - 1]
            } else {
                while x >= xs[seg + 1] {
                    seg += 1;
                }
                hermite(x, xs[seg], xs[seg + 1], ys[seg], ys[seg + 1], tangents[seg], tangents[seg + 1])
            };
            *out = y.round().clamp(0.0, 255.0) as u8;
        }
        lut
    }
}

impl Default for ToneCurve {
    fn default() -> Self {
        Self::identity()
    }
}

impl TryFrom<Vec<CurvePoint>> for ToneCurve {
    type Error = OpsError;

    fn try_from(points: Vec<CurvePoint>) -> OpsResult<Self> {
        Self::new(points)
    }
}

impl From<ToneCurve> for Vec<CurvePoint> {
    fn from(curve: ToneCurve) -> Self {
        curve.points
    }
}

/// `lut[i] = i`.
pub fn identity_lut() -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        *v = i as u8;
    }
    lut
}

/// Tangents for a monotone piecewise-cubic through `(xs, ys)`.
fn monotone_tangents(xs: &[f32], ys: &[f32]) -> Vec<f32> {
    let n = xs.len();
    let secants: Vec<f32> = (0..n - 1)
        .map(|k| (ys[k + 1] - ys[k]) / (xs[k + 1] - xs[k]))
        .collect();

    let mut m = vec![0.0f32; n];
    m[0] = secants[0];
    m[n - 1] = secants[n - 2];
    for k in 1..n - 1 {
        m[k] = (secants[k - 1] + secants[k]) * 0.5;
    }

    for (k, &delta) in secants.iter().enumerate() {
        if delta == 0.0 {
            m[k] = 0.0;
            m[k + 1] = 0.0;
            continue;
        }
        let alpha = m[k] / delta;
        let beta = m[k + 1] / delta;
        let s = alpha * alpha + beta * beta;
        if s > 9.0 {
            let tau = 3.0 / s.sqrt();
            m[k] = tau * alpha * delta;
            m[k + 1] = tau * beta * delta;
        }
    }
    m
}

#[inline]
fn hermite(x: f32, x0: f32, x1: f32, y0: f32, y1: f32, m0: f32, m1: f32) -> f32 {
    let h = x1 - x0;
    let t = (x - x0) / h;
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    h00 * y0 + h10 * h * m0 + h01 * y1 + h11 * h * m1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_monotone(lut: &[u8; 256]) -> bool {
        lut.windows(2).all(|w| w[0] <= w[1])
    }

    #[test]
    fn test_identity_lut() {
        let lut = ToneCurve::default().build_lut();
        for (i, &v) in lut.iter().enumerate() {
            assert_eq!(v as usize, i);
        }
    }

    #[test]
    fn test_multi_point_identity_short_circuits() {
        let c = ToneCurve::from_pairs(&[(0.0, 0.0), (0.3, 0.3), (1.0, 1.0)]).unwrap();
        assert!(c.is_identity());
        assert_eq!(c.build_lut(), identity_lut());
    }

    #[test]
    fn test_shadow_darkening() {
        let c = ToneCurve::from_pairs(&[(0.0, 0.0), (0.5, 0.25), (1.0, 1.0)]).unwrap();
        let lut = c.build_lut();
        assert!(lut[127] < 127);
        assert!(is_monotone(&lut));
        assert_eq!(lut[0], 0);
        assert_eq!(lut[255], 255);
    }

    #[test]
    fn test_steep_s_curve_stays_monotone() {
        let c = ToneCurve::from_pairs(&[
            (0.0, 0.0),
            (0.2, 0.02),
            (0.25, 0.9),
            (0.8, 0.95),
            (1.0, 1.0),
        ])
        .unwrap();
        let lut = c.build_lut();
        assert!(is_monotone(&lut));
        // no overshoot past the control point plateau
        assert!(lut[(0.8f32 * 255.0) as usize] <= 243);
    }

    #[test]
    fn test_flat_segment_has_no_overshoot() {
        let c = ToneCurve::from_pairs(&[(0.0, 0.0), (0.4, 0.5), (0.6, 0.5), (1.0, 1.0)]).unwrap();
        let lut = c.build_lut();
        let lo = (0.4f32 * 255.0).ceil() as usize;
        let hi = (0.6f32 * 255.0).floor() as usize;
        for v in &lut[lo..=hi] {
            assert!((*v as i32 - 128).abs() <= 1, "plateau value {v}");
        }
        assert!(is_monotone(&lut));
    }

    #[test]
    fn test_outside_range_clamps_to_endpoints() {
        let c = ToneCurve::from_pairs(&[(0.2, 0.1), (0.8, 0.9)]).unwrap();
        let lut = c.build_lut();
        assert_eq!(lut[0], (0.1f32 * 255.0).round() as u8);
        assert_eq!(lut[255], (0.9f32 * 255.0).round() as u8);
    }

    #[test]
    fn test_points_are_sorted() {
        let c = ToneCurve::from_pairs(&[(1.0, 1.0), (0.0, 0.0), (0.5, 0.6)]).unwrap();
        let xs: Vec<f32> = c.points().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_validation() {
        assert!(ToneCurve::from_pairs(&[(0.5, 0.5)]).is_err());
        assert!(ToneCurve::from_pairs(&[(0.0, 0.0), (1.2, 1.0)]).is_err());
        assert!(ToneCurve::from_pairs(&[(0.0, 0.0), (0.5, 0.2), (0.5, 0.8)]).is_err());
        assert!(ToneCurve::from_pairs(&[(0.0, f32::NAN), (1.0, 1.0)]).is_err());
    }
}
