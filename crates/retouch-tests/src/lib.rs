//! Integration tests for the retouch crates.
//!
//! End-to-end checks of the pipeline contract: neutral edits are exact
//! no-ops, every stage honours its documented edge cases, and any valid
//! adjustment set renders to some valid raster.

use retouch_core::Raster;

/// Deterministic test images.
pub mod fixtures {
    use super::*;

    /// Smooth RGB gradient with a soft alpha ramp in the last row.
    pub fn gradient(w: u32, h: u32) -> Raster {
        let mut img = Raster::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let r = (x * 255 / w.max(2).saturating_sub(1).max(1)).min(255) as u8;
                let g = (y * 255 / h.max(2).saturating_sub(1).max(1)).min(255) as u8;
                let b = ((x + y) * 7 % 256) as u8;
                let a = if y + 1 == h { 128 } else { 255 };
                img.set_pixel(x, y, [r, g, b, a]);
            }
        }
        img
    }

    /// Hard-edged checkerboard of `cell`-pixel squares.
    pub fn checker(w: u32, h: u32, cell: u32) -> Raster {
        let mut img = Raster::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let v = if (x / cell + y / cell) % 2 == 0 { 230 } else { 25 };
                img.set_pixel(x, y, [v, v / 2, 255 - v, 255]);
            }
        }
        img
    }

    /// Small linear congruential generator for reproducible parameter sweeps.
    pub struct Lcg(pub u64);

    impl Lcg {
        /// Next value in `[0, 1)`.
        pub fn next_f32(&mut self) -> f32 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (self.0 >> 40) as f32 / (1u64 << 24) as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{checker, gradient, Lcg};
    use approx::assert_relative_eq;
    use retouch_core::{CancelToken, Mask, NormRect, Raster};
    use retouch_ops::blur::{blur_downscaled, stack_blur};
    use retouch_ops::composite::{composite, CompositeOptions};
    use retouch_ops::{filter, BackgroundMode, FilterPreset, HslSector, HslShift, ToneCurve};
    use retouch_render::{Adjustments, AutoVariant, History, Pipeline, RenderConfig, RenderRequest};

    fn render(src: &Raster, adj: &Adjustments) -> Raster {
        Pipeline::default()
            .render(src, adj, None, &RenderRequest::full(), &CancelToken::new(), &|_| {})
            .unwrap()
    }

    fn variance(img: &Raster) -> f64 {
        let vals: Vec<f64> = img.data().chunks_exact(4).map(|p| p[1] as f64).collect();
        let mean = vals.iter().sum::<f64>() / vals.len() as f64;
        vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / vals.len() as f64
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    #[test]
    fn default_adjustments_are_pixel_identical() {
        for img in [gradient(37, 23), checker(16, 16, 3), Raster::filled(1, 1, [255, 0, 7, 9])] {
            let out = render(&img, &Adjustments::default());
            assert_eq!(out, img);
            assert!(out.ptr_eq(&img));
        }
    }

    #[test]
    fn explicit_neutral_values_are_identity() {
        let img = gradient(20, 20);
        let adj = Adjustments {
            rotation: 360.0,
            crop: Some(NormRect::FULL),
            filter: FilterPreset::Cinematic,
            filter_strength: 0.0,
            vignette: -1.0,
            ..Default::default()
        };
        assert_eq!(render(&img, &adj), img);
    }

    // ------------------------------------------------------------------
    // Curves
    // ------------------------------------------------------------------

    #[test]
    fn identity_curve_lut() {
        let lut = ToneCurve::identity().build_lut();
        for (i, &v) in lut.iter().enumerate() {
            assert_eq!(v as usize, i);
        }
    }

    #[test]
    fn monotone_points_give_monotone_lut() {
        let mut rng = Lcg(42);
        for _ in 0..200 {
            let n = 2 + (rng.next_f32() * 5.0) as usize;
            let mut xs: Vec<f32> = (0..n).map(|_| rng.next_f32()).collect();
            let mut ys: Vec<f32> = (0..n).map(|_| rng.next_f32()).collect();
            xs.sort_by(f32::total_cmp);
            xs.dedup();
            ys.sort_by(f32::total_cmp);
            let pairs: Vec<(f32, f32)> = xs.iter().copied().zip(ys.iter().copied()).collect();
            let Ok(curve) = ToneCurve::from_pairs(&pairs) else { continue };
            let lut = curve.build_lut();
            assert!(lut.windows(2).all(|w| w[0] <= w[1]), "{pairs:?}");
            let (lo, hi) = (ys[0] * 255.0, ys[pairs.len() - 1] * 255.0);
            assert!(lut.iter().all(|&v| v as f32 >= lo.floor() && v as f32 <= hi.ceil()));
        }
    }

    #[test]
    fn shadow_darkening_curve_scenario() {
        let lut = ToneCurve::from_pairs(&[(0.0, 0.0), (0.5, 0.25), (1.0, 1.0)])
            .unwrap()
            .build_lut();
        assert!(lut[127] < 127);
        assert!(lut.windows(2).all(|w| w[0] <= w[1]));
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    #[test]
    fn undo_restores_prior_and_redo_restores_undone() {
        let mut h = History::default();
        let a = Adjustments { exposure: 0.4, ..Default::default() };
        let mut b = Adjustments { curve_blue: ToneCurve::from_pairs(&[(0.0, 0.2), (1.0, 0.9)]).unwrap(), ..a.clone() };
        b.hsl.insert(HslSector::Aqua, HslShift { hue: 12.0, ..Default::default() });
        h.commit(a.clone());
        h.commit(b.clone());
        assert_eq!(h.undo(), Some(&a));
        assert_eq!(h.redo(), Some(&b));
    }

    #[test]
    fn cancelled_render_leaves_history_untouched() {
        let mut h = History::default();
        h.commit(Adjustments { tint: 0.3, ..Default::default() });
        let before = h.clone();
        let token = CancelToken::new();
        token.cancel();
        let res = Pipeline::default().render(
            &gradient(10, 10),
            h.current(),
            None,
            &RenderRequest::full(),
            &token,
            &|_| {},
        );
        assert!(res.is_err());
        assert_eq!(h, before);
    }

    #[test]
    fn auto_variant_commit_is_undoable() {
        let pipeline = Pipeline::default();
        let base = pipeline.analyze(&Raster::filled(30, 30, [40, 40, 40, 255]));
        let mut h = History::default();
        assert!(AutoVariant::Vivid.commit(&mut h, &base));
        assert_eq!(h.current().saturation, 1.2);
        assert!(h.undo().unwrap().is_default());
    }

    // ------------------------------------------------------------------
    // Stack blur
    // ------------------------------------------------------------------

    #[test]
    fn blur_non_positive_radius_is_noop() {
        let src = checker(12, 12, 2);
        for r in [0, -3] {
            let mut img = src.clone();
            stack_blur(&mut img, r);
            assert_eq!(img, src);
        }
    }

    #[test]
    fn blur_variance_strictly_decreases() {
        let src = checker(48, 48, 3);
        let mut last = variance(&src);
        for r in 1..=6 {
            let mut img = src.clone();
            stack_blur(&mut img, r);
            let v = variance(&img);
            assert!(v < last, "radius {r}");
            last = v;
        }
    }

    // ------------------------------------------------------------------
    // Background compositor
    // ------------------------------------------------------------------

    #[test]
    fn compositor_contract() {
        let img = gradient(24, 18);
        let opts = CompositeOptions::default();
        let opaque = Mask::filled(24, 18, 255);
        let clear = Mask::filled(12, 9, 0);

        assert_eq!(composite(&img, Some(&clear), BackgroundMode::None, 8, &opts), img);
        assert_eq!(composite(&img, Some(&opaque), BackgroundMode::Remove, 8, &opts), img);
        assert_eq!(composite(&img, Some(&clear), BackgroundMode::Remove, 8, &opts), Raster::new(24, 18));
        assert_eq!(
            composite(&img, Some(&clear), BackgroundMode::Blur, 8, &opts),
            blur_downscaled(&img, 8, opts.blur_edge)
        );
    }

    #[test]
    fn background_mask_follows_geometry() {
        // subject on the left half only
        let img = Raster::filled(20, 10, [100, 150, 200, 255]);
        let mut data = vec![0u8; 200];
        for row in data.chunks_exact_mut(20) {
            row[..10].fill(255);
        }
        let mask = Mask::from_data(20, 10, data).unwrap();
        let adj = Adjustments {
            flip_horizontal: true,
            background_mode: BackgroundMode::Remove,
            ..Default::default()
        };
        let out = Pipeline::default()
            .render(&img, &adj, Some(&mask), &RenderRequest::full(), &CancelToken::new(), &|_| {})
            .unwrap();
        // after the flip the subject sits on the right
        assert_eq!(out.pixel(19, 5)[3], 255);
        assert_eq!(out.pixel(0, 5)[3], 0);
    }

    // ------------------------------------------------------------------
    // Scenarios
    // ------------------------------------------------------------------

    #[test]
    fn contrast_keeps_mid_gray() {
        let img = Raster::filled(2, 2, [128, 128, 128, 255]);
        let adj = Adjustments { contrast: 1.2, ..Default::default() };
        assert_eq!(render(&img, &adj), img);
    }

    #[test]
    fn vignette_center_of_single_pixel() {
        let img = Raster::filled(1, 1, [255, 255, 255, 255]);
        let adj = Adjustments { vignette: 1.0, ..Default::default() };
        assert_eq!(render(&img, &adj), img);
    }

    #[test]
    fn sharpen_zero_returns_input() {
        let img = checker(9, 9, 2);
        assert!(filter::sharpen(&img, 0.0).ptr_eq(&img));
    }

    // ------------------------------------------------------------------
    // Robustness
    // ------------------------------------------------------------------

    #[test]
    fn degenerate_crop_clamps_to_one_pixel() {
        let img = gradient(30, 20);
        for crop in [
            NormRect::new(0.5, 0.5, 0.5, 0.5),
            NormRect::new(0.9, 0.9, 0.1, 0.1),
            NormRect::new(-1.0, -1.0, 2.0, 2.0),
        ] {
            let adj = Adjustments { crop: Some(crop), ..Default::default() };
            let out = render(&img, &adj);
            assert!(out.width() >= 1 && out.height() >= 1);
            assert!(out.width() <= 30 && out.height() <= 20);
        }
    }

    #[test]
    fn every_adjustment_at_once_renders() {
        let img = gradient(64, 40);
        let mut adj = Adjustments {
            exposure: 0.3,
            brightness: -0.1,
            contrast: 1.3,
            highlights: -0.4,
            shadows: 0.5,
            whites: 0.2,
            blacks: -0.2,
            saturation: 1.2,
            vibrance: 0.4,
            temperature: 0.3,
            tint: -0.2,
            skin_tone: 0.5,
            skin_color: 0.3,
            clarity: 0.4,
            sharpen: 0.5,
            vignette: 0.6,
            denoise: 0.3,
            blur: 0.05,
            dehaze: 0.2,
            rotation: 90.0,
            straighten: 4.0,
            flip_horizontal: true,
            filter: FilterPreset::Vintage,
            filter_strength: 0.6,
            crop: Some(NormRect::new(0.1, 0.1, 0.9, 0.9)),
            curve_rgb: ToneCurve::from_pairs(&[(0.0, 0.05), (0.5, 0.55), (1.0, 0.95)]).unwrap(),
            curve_luminance: ToneCurve::from_pairs(&[(0.0, 0.0), (0.3, 0.2), (1.0, 1.0)]).unwrap(),
            ..Default::default()
        };
        adj.hsl.insert(HslSector::Red, HslShift { hue: 10.0, saturation: 0.2, luminance: -0.1 });
        let out = render(&img, &adj);
        assert!(!out.is_empty());
        assert_eq!(out.data().len(), out.pixel_count() * 4);
    }

    #[test]
    fn extreme_values_still_render() {
        let img = gradient(24, 16);
        let mask = checker(24, 16, 6).data().chunks_exact(4).map(|p| p[0]).collect::<Vec<_>>();
        let mask = Mask::from_data(24, 16, mask).unwrap();
        let presets = [FilterPreset::None, FilterPreset::Sepia, FilterPreset::Dramatic];
        let modes = [BackgroundMode::None, BackgroundMode::Remove, BackgroundMode::Blur];
        let pipeline = Pipeline::default();
        let mut rng = Lcg(7);

        for i in 0..40 {
            let magnitude = [1.0e2, 1.0e4, 1.0e6, 1.0e9][i % 4];
            let mut big = || (rng.next_f32() * 2.0 - 1.0) * magnitude;
            let mut adj = Adjustments {
                exposure: big(),
                brightness: big(),
                contrast: big(),
                highlights: big(),
                shadows: big(),
                whites: big(),
                blacks: big(),
                saturation: big(),
                vibrance: big(),
                temperature: big(),
                tint: big(),
                skin_tone: big(),
                skin_color: big(),
                clarity: big(),
                sharpen: big(),
                vignette: big(),
                denoise: big(),
                blur: big(),
                dehaze: big(),
                rotation: big(),
                straighten: big(),
                filter_strength: big(),
                background_blur_radius: big().abs(),
                flip_horizontal: i % 2 == 0,
                flip_vertical: i % 3 == 0,
                filter: presets[i % 3],
                background_mode: modes[i % 3],
                ..Default::default()
            };
            adj.hsl.insert(HslSector::Orange, HslShift { hue: big(), saturation: big(), luminance: big() });

            let out = pipeline
                .render(&img, &adj, Some(&mask), &RenderRequest::full(), &CancelToken::new(), &|_| {})
                .unwrap();
            assert!(!out.is_empty(), "iteration {i}");
            assert_eq!(out.data().len(), out.pixel_count() * 4);
        }
    }

    #[test]
    fn huge_blur_radius_keeps_uniform_image() {
        let mut img = Raster::filled(8, 8, [255, 255, 255, 255]);
        stack_blur(&mut img, 5_000_000);
        assert_eq!(img, Raster::filled(8, 8, [255, 255, 255, 255]));

        let adj = Adjustments {
            background_mode: BackgroundMode::Blur,
            background_blur_radius: 5.0e6,
            blur: 1.0e6,
            ..Default::default()
        };
        let src = Raster::filled(8, 8, [255, 255, 255, 255]);
        let out = Pipeline::default()
            .render(&src, &adj, Some(&Mask::filled(8, 8, 0)), &RenderRequest::full(), &CancelToken::new(), &|_| {})
            .unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn preview_and_full_agree_on_aspect() {
        let img = gradient(300, 200);
        let adj = Adjustments { crop: Some(NormRect::new(0.0, 0.0, 0.5, 1.0)), ..Default::default() };
        let p = Pipeline::default();
        let t = CancelToken::new();
        let full = p.render(&img, &adj, None, &RenderRequest::full(), &t, &|_| {}).unwrap();
        let preview = p.render(&img, &adj, None, &RenderRequest::preview(100, 100), &t, &|_| {}).unwrap();
        assert_eq!(full.dimensions(), (150, 200));
        assert_eq!(preview.dimensions(), (75, 100));
        assert_relative_eq!(
            full.width() as f32 / full.height() as f32,
            preview.width() as f32 / preview.height() as f32
        );
    }

    #[test]
    fn adjustments_sidecar_roundtrip() {
        use std::io::Write;

        let mut adj = Adjustments {
            temperature: 0.25,
            background_mode: BackgroundMode::Blur,
            background_blur_radius: 12.0,
            ..Default::default()
        };
        adj.hsl.insert(HslSector::Green, HslShift { saturation: -0.5, ..Default::default() });
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(adj.to_ron_string().unwrap().as_bytes()).unwrap();
        assert_eq!(Adjustments::load(file.path()).unwrap(), adj);
    }

    #[test]
    fn configured_pool_matches_global() {
        let img = gradient(40, 33);
        let adj = Adjustments { vibrance: 0.5, sharpen: 0.3, ..Default::default() };
        let single = Pipeline::new(RenderConfig { threads: 1, ..Default::default() });
        let t = CancelToken::new();
        let a = single.render(&img, &adj, None, &RenderRequest::full(), &t, &|_| {}).unwrap();
        assert_eq!(a, render(&img, &adj));
    }
}
