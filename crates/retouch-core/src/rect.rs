//! Pixel and normalized rectangles.
//!
//! - [`Rect`] - integer pixel region, origin top-left
//! - [`NormRect`] - edge coordinates in `0..=1` relative to a frame, used for
//!   crops so they survive preview/full-resolution changes
//!
//! ```rust
//! use retouch_core::{NormRect, Rect};
//!
//! let crop = NormRect::new(0.25, 0.25, 0.75, 0.75);
//! assert_eq!(crop.to_pixels(200, 100), Rect::new(50, 25, 100, 50));
//! ```

/// Integer pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Rect {
    /// Creates a rectangle from origin and size.
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle covering a whole `width × height` frame.
    #[inline]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }
}

/// Normalized rectangle given by its four edges in `0..=1`.
///
/// A well-formed rect satisfies `0 <= left < right <= 1` and
/// `0 <= top < bottom <= 1`. Malformed values are tolerated: conversion to
/// pixels clamps and enforces a 1×1 minimum instead of failing.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormRect {
    /// Left edge
    pub left: f32,
    /// Top edge
    pub top: f32,
    /// Right edge
    pub right: f32,
    /// Bottom edge
    pub bottom: f32,
}

impl Default for NormRect {
    fn default() -> Self {
        Self::FULL
    }
}

impl NormRect {
    /// The whole frame.
    pub const FULL: NormRect = NormRect {
        left: 0.0,
        top: 0.0,
        right: 1.0,
        bottom: 1.0,
    };

    /// Creates a rect from its edges.
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Width as a fraction of the frame.
    #[inline]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Height as a fraction of the frame.
    #[inline]
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Returns `true` if the rect covers the whole frame.
    pub fn is_full(&self) -> bool {
        self.left <= 0.0 && self.top <= 0.0 && self.right >= 1.0 && self.bottom >= 1.0
    }

    /// Maps to pixels of a `width × height` frame.
    ///
    /// Edges are floored and clamped to the frame, and the result is at
    /// least 1×1 even for degenerate input.
    pub fn to_pixels(&self, width: u32, height: u32) -> Rect {
        let w = width.max(1);
        let h = height.max(1);
        let edge = |v: f32, extent: u32| -> u32 {
            if v.is_nan() {
                return 0;
            }
            ((v.clamp(0.0, 1.0) * extent as f32).floor() as u32).min(extent)
        };

        let x0 = edge(self.left, w).min(w - 1);
        let y0 = edge(self.top, h).min(h - 1);
        let x1 = edge(self.right, w).max(x0 + 1).min(w);
        let y1 = edge(self.bottom, h).max(y0 + 1).min(h);
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Largest centered rect with aspect ratio `target_ratio` inside a frame
    /// whose aspect ratio is `image_ratio` (both width / height).
    ///
    /// ```rust
    /// use retouch_core::NormRect;
    ///
    /// // square crop of a 2:1 frame keeps the full height
    /// let r = NormRect::max_for_aspect(2.0, 1.0);
    /// assert_eq!(r, NormRect::new(0.25, 0.0, 0.75, 1.0));
    /// ```
    pub fn max_for_aspect(image_ratio: f32, target_ratio: f32) -> Self {
        if !(image_ratio > 0.0 && target_ratio > 0.0) {
            return Self::FULL;
        }
        let rr = target_ratio / image_ratio;
        let (w, h) = if rr < 1.0 { (rr, 1.0) } else { (1.0, 1.0 / rr) };
        let left = (1.0 - w) / 2.0;
        let top = (1.0 - h) / 2.0;
        Self::new(left, top, left + w, top + h)
    }
}
