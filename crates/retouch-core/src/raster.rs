//! RGBA8 raster buffer.
//!
//! [`Raster`] is the only image container the engine works with: a
//! width × height grid of straight (non-premultiplied) RGBA pixels, one
//! byte per channel.
//!
//! # Memory Layout
//!
//! Pixels are stored row-major, top-to-bottom, channels interleaved:
//!
//! ```text
//! Memory: [R G B A R G B A ...]  <- Row 0
//!         [R G B A R G B A ...]  <- Row 1
//! ```
//!
//! # Sharing
//!
//! The buffer lives in an [`Arc<Vec<u8>>`]. Cloning a raster is cheap and a
//! stage that has nothing to do hands back a clone of its input, so callers
//! can detect passthrough with [`Raster::ptr_eq`]. Mutating accessors copy
//! the buffer first if it is shared.
//!
//! ```rust
//! use retouch_core::Raster;
//!
//! let a = Raster::filled(2, 2, [10, 20, 30, 255]);
//! let mut b = a.clone();
//! assert!(a.ptr_eq(&b));
//!
//! b.set_pixel(0, 0, [0, 0, 0, 255]);
//! assert!(!a.ptr_eq(&b));
//! assert_eq!(a.pixel(0, 0), [10, 20, 30, 255]);
//! ```

use crate::{Error, Result};
use crate::pixel::{pack_argb, unpack_argb};
use std::sync::Arc;

/// Owned RGBA8 image with copy-on-write storage.
#[derive(Clone)]
pub struct Raster {
    data: Arc<Vec<u8>>,
    width: u32,
    height: u32,
}

impl Raster {
    /// Number of interleaved channels per pixel.
    pub const CHANNELS: usize = 4;

    /// Creates a fully transparent black raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    /// Creates a raster with every pixel set to `rgba`.
    ///
    /// ```rust
    /// use retouch_core::Raster;
    ///
    /// let gray = Raster::filled(3, 2, [128, 128, 128, 255]);
    /// assert_eq!(gray.pixel(2, 1), [128, 128, 128, 255]);
    /// ```
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * Self::CHANNELS);
        for _ in 0..count {
            data.extend_from_slice(&rgba);
        }
        Self {
            data: Arc::new(data),
            width,
            height,
        }
    }

    /// Wraps an existing RGBA byte buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if `data.len()` is not
    /// `width * height * 4`.
    pub fn from_data(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * Self::CHANNELS;
        if data.len() != expected {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("expected {} bytes, got {}", expected, data.len()),
            ));
        }
        Ok(Self {
            data: Arc::new(data),
            width,
            height,
        })
    }

    /// Builds a raster from packed `0xAARRGGBB` words.
    ///
    /// This is the layout most platform bitmap APIs hand out.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if `pixels.len()` is not
    /// `width * height`.
    pub fn from_argb(width: u32, height: u32, pixels: &[u32]) -> Result<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("expected {} pixels, got {}", expected, pixels.len()),
            ));
        }
        let mut data = Vec::with_capacity(expected * Self::CHANNELS);
        for &p in pixels {
            data.extend_from_slice(&unpack_argb(p));
        }
        Ok(Self {
            data: Arc::new(data),
            width,
            height,
        })
    }

    /// Packs the raster into `0xAARRGGBB` words.
    pub fn to_argb(&self) -> Vec<u32> {
        self.data
            .chunks_exact(Self::CHANNELS)
            .map(|px| pack_argb([px[0], px[1], px[2], px[3]]))
            .collect()
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Total number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Returns `true` if either dimension is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Length of the longer side.
    #[inline]
    pub fn long_edge(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Bytes per row.
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.width as usize * Self::CHANNELS
    }

    /// Raw RGBA bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable RGBA bytes, copying the buffer first if it is shared.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    /// Consumes the raster and returns its bytes, copying only if shared.
    pub fn into_data(self) -> Vec<u8> {
        Arc::try_unwrap(self.data).unwrap_or_else(|shared| (*shared).clone())
    }

    /// Returns `true` if both rasters share the same buffer.
    #[inline]
    pub fn ptr_eq(&self, other: &Raster) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Reads a pixel.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the raster.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.index(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Writes a pixel.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the raster.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.index(x, y);
        self.data_mut()[i..i + 4].copy_from_slice(&rgba);
    }

    /// One row of RGBA bytes.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.row_stride();
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    /// One mutable row of RGBA bytes.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.row_stride();
        let start = y as usize * stride;
        &mut self.data_mut()[start..start + stride]
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * Self::CHANNELS
    }
}

impl PartialEq for Raster {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && (self.ptr_eq(other) || self.data == other.data)
    }
}

impl Eq for Raster {}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("shared", &(Arc::strong_count(&self.data) > 1))
            .finish()
    }
}
