//! Staged render pipeline.
//!
//! A render turns a source raster and an [`Adjustments`] value into a new
//! raster. Stages run in a fixed order and each one is skipped when it would
//! not change the image:
//!
//! ```text
//! source ─► geometry ─► background ─► color matrix ─► pixel engine ─► spatial ─► output
//! ```
//!
//! - **geometry**: rotate, straighten, flip, crop and preview downscale in a
//!   single resampling pass; the segmentation mask goes through the same plan
//! - **background**: remove or blur the background over the mask
//! - **color matrix**: preset, contrast, saturation, exposure, brightness
//! - **pixel engine**: white balance, skin, dehaze, vibrance, tone, vignette,
//!   curves, HSL
//! - **spatial**: sharpen, structure, global blur, denoise
//!
//! The cancel token is checked between stages and once per pixel-engine band.
//! Progress is reported as the cumulative [`StageWeights`] of finished work.
//!
//! # Example
//!
//! ```rust
//! use retouch_core::{CancelToken, Raster};
//! use retouch_render::{Adjustments, Pipeline, RenderConfig, RenderRequest};
//!
//! let pipeline = Pipeline::new(RenderConfig::default());
//! let src = Raster::filled(64, 48, [128, 128, 128, 255]);
//! let adj = Adjustments { rotation: 90.0, ..Default::default() };
//! let out = pipeline
//!     .render(&src, &adj, None, &RenderRequest::full(), &CancelToken::new(), &|_| {})
//!     .unwrap();
//! assert_eq!(out.dimensions(), (48, 64));
//! ```

use std::time::Instant;

use retouch_core::{CancelToken, Cancelled, Mask, Raster};
use retouch_ops::composite::composite;
use retouch_ops::{analyze, filter, AutoParams, BackgroundMode, GeometryPlan, PixelPlan};
#[allow(unused_imports)]
use tracing::{debug, trace, warn};

use crate::adjustments::Adjustments;
use crate::config::{RenderConfig, StageWeights};

const MAX_BACKGROUND_RADIUS: f32 = 65_536.0;

/// What to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderRequest {
    /// Bounding box for a downscaled preview; `None` renders full resolution.
    pub preview: Option<(u32, u32)>,
    /// Render the uncropped frame (used while the crop itself is edited).
    pub ignore_crop: bool,
}

impl RenderRequest {
    /// Full-resolution render.
    pub fn full() -> Self {
        Self::default()
    }

    /// Preview bounded by `(width, height)`.
    pub fn preview(width: u32, height: u32) -> Self {
        Self {
            preview: Some((width, height)),
            ignore_crop: false,
        }
    }

    /// Same request with the crop ignored.
    pub fn without_crop(self) -> Self {
        Self { ignore_crop: true, ..self }
    }
}

/// The render pipeline with its configuration and optional private pool.
pub struct Pipeline {
    config: RenderConfig,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("private_pool", &self.pool.is_some())
            .finish()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl Pipeline {
    /// Creates a pipeline. A non-zero `config.threads` gets its own pool.
    pub fn new(config: RenderConfig) -> Self {
        let pool = config.build_pool();
        Self { config, pool }
    }

    /// Active configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Runs the auto-enhance analyzer on `src`.
    pub fn analyze(&self, src: &Raster) -> AutoParams {
        self.install(|| analyze::auto_params(src, self.config.analysis_edge))
    }

    /// Renders `src` with `adj`.
    ///
    /// `mask` describes the source image; it is only used when a background
    /// mode is set. `progress` receives the cumulative weight of the finished
    /// work, ending at [`StageWeights::total`].
    ///
    /// # Errors
    ///
    /// [`Cancelled`] if `cancel` fires before the render completes.
    pub fn render(
        &self,
        src: &Raster,
        adj: &Adjustments,
        mask: Option<&Mask>,
        request: &RenderRequest,
        cancel: &CancelToken,
        progress: &(dyn Fn(f32) + Sync),
    ) -> Result<Raster, Cancelled> {
        self.install(|| self.render_stages(src, adj, mask, request, cancel, progress))
    }

    /// Preview render bounded by [`RenderConfig::preview_size`].
    pub fn render_preview(
        &self,
        src: &Raster,
        adj: &Adjustments,
        mask: Option<&Mask>,
        cancel: &CancelToken,
    ) -> Result<Raster, Cancelled> {
        let (w, h) = self.config.preview_size;
        self.render(src, adj, mask, &RenderRequest::preview(w, h), cancel, &|_| {})
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    fn render_stages(
        &self,
        src: &Raster,
        adj: &Adjustments,
        mask: Option<&Mask>,
        request: &RenderRequest,
        cancel: &CancelToken,
        progress: &(dyn Fn(f32) + Sync),
    ) -> Result<Raster, Cancelled> {
        let weights: &StageWeights = &self.config.stage_weights;
        let started = Instant::now();
        trace!(width = src.width(), height = src.height(), ?request, "render");
        cancel.check()?;

        // geometry
        let mut geometry = adj.geometry();
        if request.ignore_crop {
            geometry.crop = None;
        }
        let plan = GeometryPlan::new(src.width(), src.height(), &geometry, request.preview);
        let mut img = if plan.is_identity() {
            debug!("geometry skipped");
            src.clone()
        } else {
            let t = Instant::now();
            let out = plan.apply(src);
            debug!(out_w = out.width(), out_h = out.height(), elapsed_ms = t.elapsed().as_millis() as u64, "geometry");
            out
        };
        cancel.check()?;

        // background
        if adj.background_mode != BackgroundMode::None {
            match mask {
                Some(m) => {
                    let t = Instant::now();
                    let m = plan.apply_mask(m);
                    let radius = adj.background_blur_radius.round().clamp(0.0, MAX_BACKGROUND_RADIUS) as i32;
                    img = composite(&img, Some(&m), adj.background_mode, radius, &self.config.composite_options());
                    debug!(mode = ?adj.background_mode, elapsed_ms = t.elapsed().as_millis() as u64, "background");
                }
                None => warn!(mode = ?adj.background_mode, "no segmentation mask; background effect skipped"),
            }
        }
        let mut done = weights.geometry;
        progress(done);
        cancel.check()?;

        // color matrix
        let matrix = adj.color_matrix();
        if matrix.is_identity() {
            debug!("color matrix skipped");
        } else {
            let t = Instant::now();
            img = matrix.apply(&img);
            debug!(elapsed_ms = t.elapsed().as_millis() as u64, "color matrix");
        }
        done += weights.color;
        progress(done);
        cancel.check()?;

        // pixel engine
        let pixel = PixelPlan::new(&adj.pixel_params(), img.width(), img.height());
        if pixel.is_noop() {
            debug!("pixel engine skipped");
        } else {
            let t = Instant::now();
            let base = done;
            let span = weights.pixel;
            img = pixel.run(&img, self.config.min_chunk_rows, cancel, &|p| progress(base + p * span))?;
            debug!(steps = pixel.active_steps(), elapsed_ms = t.elapsed().as_millis() as u64, "pixel engine");
        }
        done += weights.pixel;
        progress(done);

        // spatial filters
        if adj.has_spatial() {
            let t = Instant::now();
            let step = weights.spatial / 4.0;
            let stages: [(&str, f32, &dyn Fn(&Raster, f32) -> Raster); 4] = [
                ("sharpen", adj.sharpen, &filter::sharpen),
                ("structure", adj.clarity, &filter::structure),
                ("blur", adj.blur, &|r: &Raster, a: f32| filter::blur(r, a, self.config.blur_downscale_edge)),
                ("denoise", adj.denoise, &filter::denoise),
            ];
            for (name, amount, op) in stages {
                cancel.check()?;
                if amount > 0.0 {
                    img = op(&img, amount);
                    trace!(filter = name, amount, "spatial filter");
                }
                done += step;
                progress(done);
            }
            debug!(elapsed_ms = t.elapsed().as_millis() as u64, "spatial filters");
        } else {
            debug!("spatial filters skipped");
            done += weights.spatial;
            progress(done);
        }

        debug!(
            width = img.width(),
            height = img.height(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "render done"
        );
        Ok(img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn render(src: &Raster, adj: &Adjustments) -> Raster {
        Pipeline::default()
            .render(src, adj, None, &RenderRequest::full(), &CancelToken::new(), &|_| {})
            .unwrap()
    }

    #[test]
    fn test_default_adjustments_share_buffer() {
        let src = Raster::filled(10, 10, [1, 2, 3, 255]);
        assert!(render(&src, &Adjustments::default()).ptr_eq(&src));
    }

    #[test]
    fn test_mid_gray_contrast() {
        let src = Raster::filled(2, 2, [128, 128, 128, 255]);
        let adj = Adjustments { contrast: 1.2, ..Default::default() };
        assert_eq!(render(&src, &adj), src);
    }

    #[test]
    fn test_preview_downscales() {
        let src = Raster::filled(2000, 1000, [50, 60, 70, 255]);
        let out = Pipeline::default()
            .render(&src, &Adjustments::default(), None, &RenderRequest::preview(500, 500), &CancelToken::new(), &|_| {})
            .unwrap();
        assert_eq!(out.dimensions(), (500, 250));
    }

    #[test]
    fn test_ignore_crop() {
        let src = Raster::filled(100, 80, [9, 9, 9, 255]);
        let adj = Adjustments {
            crop: Some(retouch_core::NormRect::new(0.0, 0.0, 0.5, 0.5)),
            ..Default::default()
        };
        let p = Pipeline::default();
        let t = CancelToken::new();
        let cropped = p.render(&src, &adj, None, &RenderRequest::full(), &t, &|_| {}).unwrap();
        assert_eq!(cropped.dimensions(), (50, 40));
        let full = p
            .render(&src, &adj, None, &RenderRequest::full().without_crop(), &t, &|_| {})
            .unwrap();
        assert_eq!(full.dimensions(), (100, 80));
    }

    #[test]
    fn test_cancelled_render() {
        let token = CancelToken::new();
        token.cancel();
        let src = Raster::filled(4, 4, [0, 0, 0, 255]);
        let res = Pipeline::default().render(&src, &Adjustments::default(), None, &RenderRequest::full(), &token, &|_| {});
        assert_eq!(res, Err(Cancelled));
    }

    #[test]
    fn test_progress_monotone_to_total() {
        let src = Raster::filled(30, 30, [100, 100, 100, 255]);
        let adj = Adjustments {
            exposure: 0.2,
            vibrance: 0.3,
            sharpen: 0.5,
            ..Default::default()
        };
        let seen = Mutex::new(Vec::new());
        let p = Pipeline::default();
        p.render(&src, &adj, None, &RenderRequest::full(), &CancelToken::new(), &|v| {
            seen.lock().unwrap().push(v)
        })
        .unwrap();
        let seen = seen.into_inner().unwrap();
        let last = *seen.last().unwrap();
        approx::assert_relative_eq!(last, p.config().stage_weights.total(), epsilon = 1e-5);
        assert!(seen.iter().all(|&v| v <= last + 1e-5));
    }

    #[test]
    fn test_background_without_mask_is_passthrough() {
        let src = Raster::filled(8, 8, [10, 20, 30, 255]);
        let adj = Adjustments { background_mode: BackgroundMode::Remove, ..Default::default() };
        assert_eq!(render(&src, &adj), src);
    }

    #[test]
    fn test_background_remove_with_empty_mask() {
        let src = Raster::filled(8, 8, [10, 20, 30, 255]);
        let adj = Adjustments { background_mode: BackgroundMode::Remove, ..Default::default() };
        let mask = Mask::filled(8, 8, 0);
        let out = Pipeline::default()
            .render(&src, &adj, Some(&mask), &RenderRequest::full(), &CancelToken::new(), &|_| {})
            .unwrap();
        assert_eq!(out, Raster::new(8, 8));
    }

    #[test]
    fn test_background_blur_huge_radius() {
        let src = Raster::filled(8, 8, [255, 255, 255, 255]);
        let mask = Mask::filled(8, 8, 0);
        for radius in [5.0e6, f32::MAX, f32::NAN, -3.0] {
            let adj = Adjustments {
                background_mode: BackgroundMode::Blur,
                background_blur_radius: radius,
                ..Default::default()
            };
            let out = Pipeline::default()
                .render(&src, &adj, Some(&mask), &RenderRequest::full(), &CancelToken::new(), &|_| {})
                .unwrap();
            assert_eq!(out, src, "radius {radius}");
        }
    }

    #[test]
    fn test_private_pool() {
        let p = Pipeline::new(RenderConfig { threads: 2, ..Default::default() });
        let src = Raster::filled(16, 16, [100, 100, 100, 255]);
        let adj = Adjustments { tint: 0.5, ..Default::default() };
        let out = p.render(&src, &adj, None, &RenderRequest::full(), &CancelToken::new(), &|_| {}).unwrap();
        assert_eq!(out.pixel(0, 0), [100, 110, 100, 255]);
    }
}
