//! Render configuration.
//!
//! Every field has a default, so a RON file only needs the values it changes:
//!
//! ```rust
//! use retouch_render::RenderConfig;
//!
//! let cfg = RenderConfig::from_ron_str("(preview_size: (480, 640), threads: 2)").unwrap();
//! assert_eq!(cfg.preview_size, (480, 640));
//! assert_eq!(cfg.min_chunk_rows, 10);
//! ```

use std::path::Path;

use retouch_ops::CompositeOptions;
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use tracing::{debug, warn};

use crate::error::{RenderError, RenderResult};

/// Share of the progress bar each pipeline stage reports.
///
/// The weights need not sum to one; whatever is left belongs to the caller
/// (for example encoding and writing the result).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageWeights {
    /// Geometry and background compositing.
    pub geometry: f32,
    /// Color matrix.
    pub color: f32,
    /// Pixel engine.
    pub pixel: f32,
    /// Spatial filters.
    pub spatial: f32,
}

impl Default for StageWeights {
    fn default() -> Self {
        Self {
            geometry: 0.10,
            color: 0.10,
            pixel: 0.30,
            spatial: 0.30,
        }
    }
}

impl StageWeights {
    /// Sum of all stage weights.
    pub fn total(&self) -> f32 {
        self.geometry + self.color + self.pixel + self.spatial
    }
}

/// Tunables of the render pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Bounding box `(width, height)` for live previews.
    pub preview_size: (u32, u32),
    /// Worker pool size; 0 uses all available cores.
    pub threads: usize,
    /// Minimum rows per pixel-engine band.
    pub min_chunk_rows: usize,
    /// Long-edge cap for global and background blur.
    pub blur_downscale_edge: u32,
    /// Long-edge cap for segmentation mask processing.
    pub mask_working_edge: u32,
    /// Mask feather radius at the working resolution.
    pub mask_feather_radius: i32,
    /// Long-edge size used by the auto-enhance analyzer.
    pub analysis_edge: u32,
    /// Progress weights per stage.
    pub stage_weights: StageWeights,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            preview_size: (720, 1280),
            threads: 0,
            min_chunk_rows: 10,
            blur_downscale_edge: 1024,
            mask_working_edge: 1024,
            mask_feather_radius: 3,
            analysis_edge: 256,
            stage_weights: StageWeights::default(),
        }
    }
}

impl RenderConfig {
    /// Parses a configuration from RON text.
    pub fn from_ron_str(text: &str) -> RenderResult<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Loads a configuration from a RON file.
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| RenderError::io(path, e))?;
        let cfg = Self::from_ron_str(&text)?;
        debug!(path = %path.display(), "render config loaded");
        Ok(cfg)
    }

    /// Pretty-printed RON.
    pub fn to_ron_string(&self) -> RenderResult<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Compositor limits derived from this configuration.
    pub fn composite_options(&self) -> CompositeOptions {
        CompositeOptions {
            mask_edge: self.mask_working_edge,
            feather_radius: self.mask_feather_radius,
            blur_edge: self.blur_downscale_edge,
        }
    }

    /// Builds a rayon pool honouring [`threads`](Self::threads).
    ///
    /// Returns `None` (use the global pool) when `threads` is 0 or the pool
    /// cannot be created.
    pub fn build_pool(&self) -> Option<rayon::ThreadPool> {
        if self.threads == 0 {
            return None;
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|i| format!("retouch-{i}"))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!(error = %e, threads = self.threads, "falling back to global pool");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = RenderConfig::default();
        assert_eq!(cfg.preview_size, (720, 1280));
        assert_eq!(cfg.blur_downscale_edge, 1024);
        assert_eq!(cfg.analysis_edge, 256);
        approx::assert_relative_eq!(cfg.stage_weights.total(), 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_partial_ron() {
        let cfg = RenderConfig::from_ron_str("(stage_weights: (pixel: 0.5))").unwrap();
        assert_eq!(cfg.stage_weights.pixel, 0.5);
        assert_eq!(cfg.stage_weights.geometry, 0.10);
        assert_eq!(cfg.min_chunk_rows, 10);
    }

    #[test]
    fn test_ron_roundtrip_via_file() {
        let cfg = RenderConfig { threads: 3, mask_feather_radius: 5, ..Default::default() };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(cfg.to_ron_string().unwrap().as_bytes()).unwrap();
        assert_eq!(RenderConfig::load(file.path()).unwrap(), cfg);
    }

    #[test]
    fn test_missing_file() {
        let err = RenderConfig::load("/nonexistent/retouch.ron").unwrap_err();
        assert!(matches!(err, RenderError::Io { .. }));
    }

    #[test]
    fn test_bad_ron() {
        assert!(RenderConfig::from_ron_str("(threads: \"many\")").is_err());
    }

    #[test]
    fn test_pool() {
        assert!(RenderConfig::default().build_pool().is_none());
        let pool = RenderConfig { threads: 2, ..Default::default() }.build_pool().unwrap();
        assert_eq!(pool.current_num_threads(), 2);
    }
}
