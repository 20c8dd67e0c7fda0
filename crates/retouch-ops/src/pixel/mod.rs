//! Pixel processing engine.
//!
//! Per-pixel adjustments that cannot be folded into a color matrix. A
//! [`PixelPlan`] is resolved once per render from [`PixelParams`]: every
//! adjustment at its neutral value is dropped, so the hot loop only visits
//! the steps that do something. Active steps run in this order:
//!
//! 1. temperature / tint
//! 2. skin tone and skin color
//! 3. dehaze
//! 4. vibrance
//! 5. tone LUT (shadows, highlights, whites, blacks)
//! 6. vignette
//! 7. curves: master, then per channel, then luminance
//! 8. HSL sector shift
//!
//! # Concurrency
//!
//! [`PixelPlan::run`] splits the image into bands of
//! `max(height / threads, min_rows)` rows and processes them on the rayon
//! pool. Bands never overlap. The cancel token is checked before each band
//! and progress is reported as `completed_bands / total_bands`.
//!
//! # Example
//!
//! ```rust
//! use retouch_core::{CancelToken, Raster};
//! use retouch_ops::pixel::{PixelParams, PixelPlan};
//!
//! let img = Raster::filled(32, 32, [120, 120, 120, 255]);
//! let params = PixelParams { temperature: 0.5, ..Default::default() };
//! let plan = PixelPlan::new(&params, img.width(), img.height());
//! let out = plan.run(&img, 10, &CancelToken::new(), &|_| {}).unwrap();
//! assert_eq!(out.pixel(0, 0), [140, 120, 100, 255]);
//! ```

pub mod hsl;
pub mod tone;

pub use hsl::{HslSector, HslShift, HslTable};
pub use tone::ToneParams;

use crate::curve::ToneCurve;
use rayon::prelude::*;
use retouch_core::pixel::luma_fixed;
use retouch_core::{CancelToken, Cancelled, Raster};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
#[allow(unused_imports)]
use tracing::{debug, trace};

/// Inputs of the pixel engine. All fields default to neutral.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PixelParams {
    /// Shadow lift.
    pub shadows: f32,
    /// Highlight push.
    pub highlights: f32,
    /// White point push.
    pub whites: f32,
    /// Black point push.
    pub blacks: f32,
    /// Saturation boost weighted toward muted pixels.
    pub vibrance: f32,
    /// Warm (+) / cool (-) shift of up to 40 levels.
    pub temperature: f32,
    /// Green (+) / magenta (-) shift of up to 20 levels.
    pub tint: f32,
    /// Skin contrast around the pixel mean.
    pub skin_tone: f32,
    /// Skin brightness.
    pub skin_color: f32,
    /// Uniform haze removal.
    pub dehaze: f32,
    /// Radial darkening; only positive amounts apply.
    pub vignette: f32,
    /// Per-sector HSL shifts.
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
}

impl PixelParams {
    /// Tonal range part.
    pub fn tone(&self) -> ToneParams {
        ToneParams {
            shadows: self.shadows,
            highlights: self.highlights,
            whites: self.whites,
            blacks: self.blacks,
        }
    }
}

/// One active per-pixel step.
#[derive(Debug, Clone, PartialEq)]
enum PixelOp {
    WhiteBalance { temperature: f32, tint: f32 },
    Skin { factor: f32, brightness: Option<f32> },
    Dehaze(f32),
    Vibrance(f32),
    Tone(Box<[u8; 256]>),
    Vignette { amount: f32, cx: f32, cy: f32, inv_radius: f32 },
    ChannelCurves(Box<[[u8; 256]; 3]>),
    LuminanceCurve(Box<[u8; 256]>),
    Hsl(HslTable),
}

/// Resolved per-pixel program for one image size.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelPlan {
    ops: Vec<PixelOp>,
}

impl PixelPlan {
    /// Resolves `params` for a `width × height` image.
    pub fn new(params: &PixelParams, width: u32, height: u32) -> Self {
        let mut ops = Vec::new();

        if params.temperature != 0.0 || params.tint != 0.0 {
            ops.push(PixelOp::WhiteBalance {
                temperature: params.temperature * 40.0,
                tint: params.tint * 20.0,
            });
        }
        // skin color only brightens pixels the skin-tone pass selects
        if params.skin_tone != 0.0 {
            ops.push(PixelOp::Skin {
                factor: params.skin_tone * 0.3,
                brightness: (params.skin_color != 0.0).then(|| 1.0 + params.skin_color * 0.15),
            });
        }
        if params.dehaze != 0.0 {
            ops.push(PixelOp::Dehaze(params.dehaze * 10.0));
        }
        if params.vibrance != 0.0 {
            ops.push(PixelOp::Vibrance(params.vibrance * 0.5));
        }
        let tone = params.tone();
        if !tone.is_neutral() {
            ops.push(PixelOp::Tone(Box::new(tone.build_lut())));
        }
        if params.vignette > 0.0 {
            let (w, h) = (width as f32, height as f32);
            let radius = (w * w / 4.0 + h * h / 4.0).sqrt();
            ops.push(PixelOp::Vignette {
                amount: params.vignette,
                cx: w / 2.0,
                cy: h / 2.0,
                inv_radius: if radius > 0.0 { 1.0 / radius } else { 0.0 },
            });
        }

        let channel_curves = [&params.curve_red, &params.curve_green, &params.curve_blue];
        if !params.curve_rgb.is_identity() || channel_curves.iter().any(|c| !c.is_identity()) {
            let master = params.curve_rgb.build_lut();
            let luts = channel_curves.map(|c| {
                let lut = c.build_lut();
                master.map(|m| lut[m as usize])
            });
            ops.push(PixelOp::ChannelCurves(Box::new(luts)));
        }
        if !params.curve_luminance.is_identity() {
            ops.push(PixelOp::LuminanceCurve(Box::new(params.curve_luminance.build_lut())));
        }
        if let Some(table) = HslTable::new(&params.hsl) {
            ops.push(PixelOp::Hsl(table));
        }

        debug!(active = ops.len(), "pixel plan");
        Self { ops }
    }

    /// Returns `true` if no step is active.
    pub fn is_noop(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of active steps.
    pub fn active_steps(&self) -> usize {
        self.ops.len()
    }

    /// Runs the plan over `src`.
    ///
    /// A no-op plan returns a clone sharing the input buffer. Otherwise the
    /// image is copied once and processed band by band in parallel.
    ///
    /// # Errors
    ///
    /// [`Cancelled`] if `cancel` fires before all bands are done.
    pub fn run(
        &self,
        src: &Raster,
        min_rows: usize,
        cancel: &CancelToken,
        progress: &(dyn Fn(f32) + Sync),
    ) -> Result<Raster, Cancelled> {
        cancel.check()?;
        if self.is_noop() || src.is_empty() {
            progress(1.0);
            return Ok(src.clone());
        }

        let (w, h) = (src.width() as usize, src.height() as usize);
        let threads = rayon::current_num_threads().max(1);
        let band_rows = (h / threads).max(min_rows).max(1);
        let total = h.div_ceil(band_rows);
        trace!(width = w, height = h, band_rows, bands = total, "pixel engine");

        let mut out = src.clone();
        let stride = out.row_stride();
        let done = AtomicUsize::new(0);

        out.data_mut()
            .par_chunks_mut(band_rows * stride)
            .enumerate()
            .try_for_each(|(band, pixels)| {
                cancel.check()?;
                let y0 = band * band_rows;
                for (dy, row) in pixels.chunks_exact_mut(stride).enumerate() {
                    let y = (y0 + dy) as u32;
                    for (x, px) in row.chunks_exact_mut(Raster::CHANNELS).enumerate() {
                        let rgb = self.process(x as u32, y, [px[0], px[1], px[2]]);
                        px[..3].copy_from_slice(&rgb);
                    }
                }
                let completed = done.fetch_add(1, Ordering::AcqRel) + 1;
                progress(completed as f32 / total as f32);
                Ok(())
            })?;

        Ok(out)
    }

    /// Applies every active step to one pixel at `(x, y)`.
    pub fn process(&self, x: u32, y: u32, rgb: [u8; 3]) -> [u8; 3] {
        let [mut r, mut g, mut b] = rgb.map(i32::from);
        for op in &self.ops {
            match op {
                PixelOp::WhiteBalance { temperature, tint } => {
                    r = clamp_level(r as f32 + temperature);
                    b = clamp_level(b as f32 - temperature);
                    g = clamp_level(g as f32 + tint);
                }
                PixelOp::Skin { factor, brightness } => {
                    if b < g && g < r {
                        let ratio = g as f32 / r as f32;
                        if ratio > 0.4 && ratio < 0.85 {
                            let lum = (r + g + b) / 3;
                            r = clamp_level(r as f32 + (r - lum) as f32 * factor);
                            g = clamp_level(g as f32 + (g - lum) as f32 * factor);
                            if let Some(k) = brightness {
                                r = clamp_level(r as f32 * k);
                                g = clamp_level(g as f32 * k);
                                b = clamp_level(b as f32 * k);
                            }
                        }
                    }
                }
                PixelOp::Dehaze(amount) => {
                    r = clamp_level(r as f32 - amount);
                    g = clamp_level(g as f32 - amount);
                    b = clamp_level(b as f32 - amount);
                }
                PixelOp::Vibrance(strength) => {
                    let max = r.max(g).max(b);
                    let min = r.min(g).min(b);
                    let sat = if max == 0 { 0.0 } else { (max - min) as f32 / max as f32 };
                    let vib = strength * (1.0 - sat);
                    r = clamp_level(r as f32 + r as f32 * vib);
                    g = clamp_level(g as f32 + g as f32 * vib);
                    b = clamp_level(b as f32 + b as f32 * vib);
                }
                PixelOp::Tone(lut) => {
                    r = lut[r as usize] as i32;
                    g = lut[g as usize] as i32;
                    b = lut[b as usize] as i32;
                }
                PixelOp::Vignette { amount, cx, cy, inv_radius } => {
                    let dx = x as f32 + 0.5 - cx;
                    let dy = y as f32 + 0.5 - cy;
                    let dist = (dx * dx + dy * dy).sqrt() * inv_radius;
                    let t = ((dist - 0.3) / 0.7).clamp(0.0, 1.0);
                    let f = 1.0 - t * t * (3.0 - 2.0 * t) * amount;
                    r = clamp_level(r as f32 * f);
                    g = clamp_level(g as f32 * f);
                    b = clamp_level(b as f32 * f);
                }
                PixelOp::ChannelCurves(luts) => {
                    r = luts[0][r as usize] as i32;
                    g = luts[1][g as usize] as i32;
                    b = luts[2][b as usize] as i32;
                }
                PixelOp::LuminanceCurve(lut) => {
                    let y = luma_fixed(r as u8, g as u8, b as u8) as i32;
                    let target = lut[y as usize] as i32;
                    if y == 0 {
                        (r, g, b) = (target, target, target);
                    } else {
                        let rescale = |c: i32| ((c * target + y / 2) / y).clamp(0, 255);
                        (r, g, b) = (rescale(r), rescale(g), rescale(b));
                    }
                }
                PixelOp::Hsl(table) => {
                    let [nr, ng, nb] = table.apply(r as u8, g as u8, b as u8);
                    (r, g, b) = (nr as i32, ng as i32, nb as i32);
                }
            }
        }
        [r as u8, g as u8, b as u8]
    }
}

/// Truncates toward zero and clamps to a valid level.
#[inline]
fn clamp_level(v: f32) -> i32 {
    (v as i32).clamp(0, 255)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn run(plan: &PixelPlan, img: &Raster) -> Raster {
        plan.run(img, 10, &CancelToken::new(), &|_| {}).unwrap()
    }

    #[test]
    fn test_neutral_params_noop() {
        let plan = PixelPlan::new(&PixelParams::default(), 4, 4);
        assert!(plan.is_noop());
        let img = Raster::filled(4, 4, [9, 8, 7, 255]);
        assert!(run(&plan, &img).ptr_eq(&img));
    }

    #[test]
    fn test_temperature_and_tint() {
        let params = PixelParams { temperature: 1.0, tint: -0.5, ..Default::default() };
        let plan = PixelPlan::new(&params, 1, 1);
        assert_eq!(plan.process(0, 0, [100, 100, 100]), [140, 90, 60]);
        assert_eq!(plan.process(0, 0, [240, 5, 20]), [255, 0, 0]);
    }

    #[test]
    fn test_skin_heuristic() {
        let params = PixelParams { skin_tone: 1.0, ..Default::default() };
        let plan = PixelPlan::new(&params, 1, 1);
        // g/r = 0.6, b < g < r: a skin-like pixel
        let [r, g, b] = plan.process(0, 0, [200, 120, 80]);
        // lum = 133; r += 67*0.3, g += -13*0.3
        assert_eq!([r, g, b], [220, 116, 80]);
        // g/r = 0.9 is outside the band
        assert_eq!(plan.process(0, 0, [200, 180, 80]), [200, 180, 80]);
        // b >= g fails the ordering test
        assert_eq!(plan.process(0, 0, [200, 100, 120]), [200, 100, 120]);
    }

    #[test]
    fn test_skin_color_needs_skin_tone() {
        let plan = PixelPlan::new(&PixelParams { skin_color: 1.0, ..Default::default() }, 1, 1);
        assert!(plan.is_noop());
        assert_eq!(plan.process(0, 0, [200, 120, 80]), [200, 120, 80]);

        let params = PixelParams { skin_tone: 1.0, skin_color: 1.0, ..Default::default() };
        let plan = PixelPlan::new(&params, 1, 1);
        // [220, 116, 80] after the tone pass, then × 1.15
        assert_eq!(plan.process(0, 0, [200, 120, 80]), [253, 133, 92]);
        assert_eq!(plan.process(0, 0, [10, 200, 30]), [10, 200, 30]);
    }

    #[test]
    fn test_dehaze_and_vibrance() {
        let plan = PixelPlan::new(&PixelParams { dehaze: 1.0, ..Default::default() }, 1, 1);
        assert_eq!(plan.process(0, 0, [5, 100, 200]), [0, 90, 190]);

        let plan = PixelPlan::new(&PixelParams { vibrance: 1.0, ..Default::default() }, 1, 1);
        // gray has zero saturation: full 50% boost
        assert_eq!(plan.process(0, 0, [100, 100, 100]), [150, 150, 150]);
        // fully saturated: untouched
        assert_eq!(plan.process(0, 0, [200, 0, 0]), [200, 0, 0]);
    }

    #[test]
    fn test_vignette_center_and_corner() {
        let params = PixelParams { vignette: 1.0, ..Default::default() };
        let plan = PixelPlan::new(&params, 1, 1);
        assert_eq!(plan.process(0, 0, [255, 255, 255]), [255, 255, 255]);

        let plan = PixelPlan::new(&params, 101, 101);
        assert_eq!(plan.process(50, 50, [200, 200, 200]), [200, 200, 200]);
        let [r, _, _] = plan.process(0, 0, [200, 200, 200]);
        assert!(r < 10, "corner {r}");
    }

    #[test]
    fn test_negative_vignette_inactive() {
        let plan = PixelPlan::new(&PixelParams { vignette: -0.5, ..Default::default() }, 8, 8);
        assert!(plan.is_noop());
    }

    #[test]
    fn test_channel_curves_compose_master_first() {
        let params = PixelParams {
            curve_rgb: ToneCurve::from_pairs(&[(0.0, 0.0), (1.0, 0.5)]).unwrap(),
            curve_red: ToneCurve::from_pairs(&[(0.0, 1.0), (1.0, 0.0)]).unwrap(),
            ..Default::default()
        };
        let plan = PixelPlan::new(&params, 1, 1);
        let [r, g, b] = plan.process(0, 0, [255, 255, 0]);
        // master halves, red curve inverts the halved value
        assert!((127..=128).contains(&g), "g {g}");
        assert_eq!(r, 255 - g);
        assert_eq!(b, 0);
    }

    #[test]
    fn test_luminance_curve_preserves_ratio() {
        let params = PixelParams {
            curve_luminance: ToneCurve::from_pairs(&[(0.0, 0.0), (1.0, 0.5)]).unwrap(),
            ..Default::default()
        };
        let plan = PixelPlan::new(&params, 1, 1);
        let [r, g, b] = plan.process(0, 0, [200, 100, 50]);
        assert!(r < 200 && g < 100 && b < 50);
        let ratio = r as f32 / g as f32;
        assert!((ratio - 2.0).abs() < 0.1, "ratio {ratio}");
        // black maps straight to the curve output
        assert_eq!(plan.process(0, 0, [0, 0, 0]), [0, 0, 0]);
    }

    #[test]
    fn test_alpha_untouched() {
        let params = PixelParams { dehaze: 2.0, ..Default::default() };
        let img = Raster::filled(3, 3, [100, 100, 100, 77]);
        let out = run(&PixelPlan::new(&params, 3, 3), &img);
        assert_eq!(out.pixel(1, 1), [80, 80, 80, 77]);
    }

    #[test]
    fn test_progress_reaches_one() {
        let params = PixelParams { tint: 0.5, ..Default::default() };
        let img = Raster::filled(8, 95, [50, 50, 50, 255]);
        let seen = Mutex::new(Vec::new());
        let plan = PixelPlan::new(&params, 8, 95);
        plan.run(&img, 10, &CancelToken::new(), &|p| seen.lock().unwrap().push(p))
            .unwrap();
        let seen = seen.into_inner().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|&p| p > 0.0 && p <= 1.0));
        assert_eq!(seen.iter().cloned().fold(0.0f32, f32::max), 1.0);
    }

    #[test]
    fn test_cancelled_before_start() {
        let params = PixelParams { tint: 0.5, ..Default::default() };
        let token = CancelToken::new();
        token.cancel();
        let img = Raster::filled(4, 4, [1, 1, 1, 255]);
        let res = PixelPlan::new(&params, 4, 4).run(&img, 1, &token, &|_| {});
        assert_eq!(res, Err(Cancelled));
    }
}
