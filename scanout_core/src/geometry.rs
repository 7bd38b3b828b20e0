// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Plane geometry: aspect-preserving placement and KMS rectangle types.
//!
//! Layout math is done in `kurbo` types. The results are converted to the
//! integer and 16.16 fixed-point rectangles that `SetPlane` takes only at the
//! edge.

use kurbo::{Rect, Size};

/// Fits `src` into `dst` preserving the source aspect ratio.
///
/// The result is centered in `dst` along the axis that has slack, producing
/// letterbox bars when the source is wider than the destination and
/// pillarbox bars when it is narrower. Extents are rounded up to whole
/// pixels and offsets are rounded down, so the fitted rect never leaves a
/// one-pixel gap on the constrained axis.
#[must_use]
pub fn scale_source_to_destination(src: Size, dst: Rect) -> Rect {
    let dst_w = dst.width();
    let dst_h = dst.height();
    if src.width <= 0.0 || src.height <= 0.0 || dst_w <= 0.0 || dst_h <= 0.0 {
        return dst;
    }

    let fit_h = (dst_w * src.height / src.width).ceil();
    let fit_w = (dst_h * src.width / src.height).ceil();

    if fit_h > dst_h {
        let x = dst.x0 + ((dst_w - fit_w) / 2.0).floor();
        Rect::new(x, dst.y0, x + fit_w, dst.y1)
    } else {
        let y = dst.y0 + ((dst_h - fit_h) / 2.0).floor();
        Rect::new(dst.x0, y, dst.x1, y + fit_h)
    }
}

/// An integer CRTC-space rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PlaneRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl PlaneRect {
    /// Creates a rectangle.
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Converts a `kurbo` rect, rounding to the nearest pixel.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "display coordinates are far below the i32/u32 limits"
    )]
    pub fn from_rect(rect: Rect) -> Self {
        let rect = rect.round();
        Self {
            x: rect.x0 as i32,
            y: rect.y0 as i32,
            width: rect.width().max(0.0) as u32,
            height: rect.height().max(0.0) as u32,
        }
    }
}

/// A source rectangle in 16.16 fixed point, as `SetPlane` expects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SourceRect {
    /// Left edge, 16.16.
    pub x: u32,
    /// Top edge, 16.16.
    pub y: u32,
    /// Width, 16.16.
    pub width: u32,
    /// Height, 16.16.
    pub height: u32,
}

impl SourceRect {
    /// The whole of a `width` × `height` buffer.
    ///
    /// Sizes that do not fit 16.16 saturate; the kernel then rejects the
    /// plane update instead of scanning out a wrapped region.
    #[must_use]
    pub const fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width: to_fixed(width),
            height: to_fixed(height),
        }
    }
}

const fn to_fixed(pixels: u32) -> u32 {
    pixels.saturating_mul(1 << 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_aspect_fills_destination() {
        let out = scale_source_to_destination(
            Size::new(1920.0, 1080.0),
            Rect::new(0.0, 0.0, 3840.0, 2160.0),
        );
        assert_eq!(out, Rect::new(0.0, 0.0, 3840.0, 2160.0));
    }

    #[test]
    fn wide_source_is_letterboxed() {
        // 16:9 into 4:3.
        let out = scale_source_to_destination(
            Size::new(1920.0, 1080.0),
            Rect::new(0.0, 0.0, 1024.0, 768.0),
        );
        assert_eq!(out, Rect::new(0.0, 96.0, 1024.0, 672.0));
    }

    #[test]
    fn narrow_source_is_pillarboxed() {
        // 4:3 into 16:9.
        let out = scale_source_to_destination(
            Size::new(1440.0, 1080.0),
            Rect::new(0.0, 0.0, 1920.0, 1080.0),
        );
        assert_eq!(out, Rect::new(240.0, 0.0, 1680.0, 1080.0));
    }

    #[test]
    fn destination_origin_is_preserved() {
        let out = scale_source_to_destination(
            Size::new(1920.0, 1080.0),
            Rect::new(100.0, 50.0, 1124.0, 818.0),
        );
        assert_eq!(out, Rect::new(100.0, 146.0, 1124.0, 722.0));
    }

    #[test]
    fn degenerate_source_keeps_destination() {
        let dst = Rect::new(0.0, 0.0, 1920.0, 1080.0);
        assert_eq!(scale_source_to_destination(Size::ZERO, dst), dst);
    }

    #[test]
    fn plane_rect_rounds_to_whole_pixels() {
        let rect = PlaneRect::from_rect(Rect::new(240.0, 0.0, 1680.0, 1080.0));
        assert_eq!(rect, PlaneRect::new(240, 0, 1440, 1080));
        let rect = PlaneRect::from_rect(Rect::new(0.4, 95.6, 1024.4, 671.6));
        assert_eq!(rect, PlaneRect::new(0, 96, 1024, 576));
    }

    #[test]
    fn source_rect_is_sixteen_sixteen() {
        let src = SourceRect::full(1920, 1080);
        assert_eq!(src.width, 1920 << 16);
        assert_eq!(src.height, 1080 << 16);
        assert_eq!((src.x, src.y), (0, 0));
    }

    #[test]
    fn oversized_source_saturates_instead_of_wrapping() {
        let src = SourceRect::full(65_536, 65_535);
        assert_eq!(src.width, u32::MAX);
        assert_eq!(src.height, 65_535 << 16);
    }
}
