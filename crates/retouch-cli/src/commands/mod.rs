//! CLI command implementations

pub mod analyze;
pub mod defaults;
pub mod render;

use anyhow::{bail, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use retouch_core::{Mask, Raster};
use retouch_render::Adjustments;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Load an image as RGBA8
pub fn load_image(path: &Path) -> Result<Raster> {
    let img = image::open(path)
        .with_context(|| format!("Failed to load: {}", path.display()))?
        .to_rgba8();
    let (w, h) = img.dimensions();
    Ok(Raster::from_data(w, h, img.into_raw())?)
}

/// Load a subject mask from the luminance of an image
pub fn load_mask(path: &Path) -> Result<Mask> {
    let img = image::open(path)
        .with_context(|| format!("Failed to load mask: {}", path.display()))?
        .to_luma8();
    let (w, h) = img.dimensions();
    Ok(Mask::from_data(w, h, img.into_raw())?)
}

/// Load adjustments, or defaults when no path is given
pub fn load_adjustments(path: Option<&Path>) -> Result<Adjustments> {
    match path {
        Some(p) => Adjustments::load(p)
            .with_context(|| format!("Failed to load adjustments: {}", p.display())),
        None => Ok(Adjustments::default()),
    }
}

/// Save a raster; JPEG drops alpha and uses `quality`
pub fn save_image(path: &Path, raster: &Raster, quality: u8) -> Result<()> {
    let (w, h) = raster.dimensions();
    let rgba = RgbaImage::from_raw(w, h, raster.clone().into_data())
        .context("Raster buffer does not match its dimensions")?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if ext == "jpg" || ext == "jpeg" {
        let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();
        let file = File::create(path)
            .with_context(|| format!("Failed to create: {}", path.display()))?;
        JpegEncoder::new_with_quality(BufWriter::new(file), quality)
            .encode_image(&rgb)
            .with_context(|| format!("Failed to save: {}", path.display()))?;
    } else {
        rgba.save(path)
            .with_context(|| format!("Failed to save: {}", path.display()))?;
    }
    Ok(())
}

/// Parse `WIDTHxHEIGHT`
pub fn parse_size(s: &str) -> Result<(u32, u32)> {
    let Some((w, h)) = s.split_once(['x', 'X']) else {
        bail!("expected WIDTHxHEIGHT, got '{s}'");
    };
    let w: u32 = w.trim().parse().with_context(|| format!("invalid width in '{s}'"))?;
    let h: u32 = h.trim().parse().with_context(|| format!("invalid height in '{s}'"))?;
    if w == 0 || h == 0 {
        bail!("size must be non-zero, got '{s}'");
    }
    Ok((w, h))
}
