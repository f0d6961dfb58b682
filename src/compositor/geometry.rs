//! Pure layout math shared by preview and export.
//!
//! Everything here works in canvas pixels with a y-down coordinate system, so the same numbers
//! come out at every resolution tier.

use crate::foundation::core::{Affine, Point, Rect, Size};
use crate::session::model::Anchor;

/// Where a source raster is sampled and where it lands on the canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Sampling rectangle in source pixels.
    pub src: Rect,
    /// Destination rectangle in canvas pixels.
    pub dst: Rect,
}

/// Centered crop of `src` whose aspect ratio matches `target`.
///
/// A source that is relatively wider than the target loses width; otherwise it loses height.
pub fn cover_crop(src: Size, target: Size) -> Rect {
    if src.width <= 0.0 || src.height <= 0.0 || target.width <= 0.0 || target.height <= 0.0 {
        return Rect::ZERO;
    }
    let src_aspect = src.width / src.height;
    let target_aspect = target.width / target.height;
    let (w, h) = if src_aspect > target_aspect {
        (src.height * target_aspect, src.height)
    } else {
        (src.width, src.width / target_aspect)
    };
    Rect::from_origin_size(
        Point::new((src.width - w) / 2.0, (src.height - h) / 2.0),
        Size::new(w, h),
    )
}

/// Background placement: cover crop scaled over the whole canvas.
pub fn background_placement(src: Size, canvas: Size) -> Placement {
    Placement {
        src: cover_crop(src, canvas),
        dst: canvas.to_rect(),
    }
}

/// Video placement for `zoom` (already clamped by the caller).
///
/// `zoom >= 1` narrows the sampled source around its center and fills the canvas.
/// `zoom < 1` samples the whole letterbox base and shrinks the destination around the canvas
/// center.
pub fn video_placement(src: Size, canvas: Size, zoom: f64) -> Placement {
    let base = cover_crop(src, canvas);
    if zoom >= 1.0 {
        let w = base.width() / zoom;
        let h = base.height() / zoom;
        let src_rect = Rect::from_center_size(base.center(), Size::new(w, h));
        Placement {
            src: src_rect,
            dst: canvas.to_rect(),
        }
    } else {
        let dst_size = Size::new(canvas.width * zoom, canvas.height * zoom);
        let dst = Rect::from_center_size(canvas.to_rect().center(), dst_size);
        Placement { src: base, dst }
    }
}

/// Text watermark font size for a canvas of height `canvas_h`.
pub fn watermark_font_size(canvas_h: f64) -> f64 {
    (canvas_h / 25.0).round()
}

/// Distance between an anchored watermark box and the canvas edges.
pub fn watermark_margin(canvas_h: f64) -> f64 {
    0.5 * watermark_font_size(canvas_h)
}

/// Box of an image watermark drawn at `size_percent` of the canvas width.
pub fn image_watermark_size(canvas_w: f64, size_percent: f64, asset_aspect: f64) -> Size {
    let width = canvas_w * size_percent / 100.0;
    if asset_aspect <= 0.0 || !asset_aspect.is_finite() {
        return Size::ZERO;
    }
    Size::new(width, width / asset_aspect)
}

/// Top-left corner of a `bx` sized box placed at `anchor`.
pub fn anchor_origin(anchor: Anchor, bx: Size, canvas: Size, margin: f64) -> Point {
    let right = canvas.width - bx.width - margin;
    let bottom = canvas.height - bx.height - margin;
    match anchor {
        Anchor::TopLeft => Point::new(margin, margin),
        Anchor::TopRight => Point::new(right, margin),
        Anchor::BottomLeft => Point::new(margin, bottom),
        Anchor::BottomRight => Point::new(right, bottom),
        Anchor::Center => Point::new(
            (canvas.width - bx.width) / 2.0,
            (canvas.height - bx.height) / 2.0,
        ),
    }
}

/// Anchored watermark box on a canvas.
pub fn watermark_box(anchor: Anchor, bx: Size, canvas: Size) -> Rect {
    let origin = anchor_origin(anchor, bx, canvas, watermark_margin(canvas.height));
    Rect::from_origin_size(origin, bx)
}

/// Rotation around the center of `bx`, clockwise positive on screen.
pub fn rotation_about_center(bx: Rect, rotation_deg: f64) -> Affine {
    if rotation_deg == 0.0 {
        return Affine::IDENTITY;
    }
    Affine::rotate_about(rotation_deg.to_radians(), bx.center())
}

/// Maps source pixels of `p.src` onto `p.dst`.
pub fn placement_transform(p: Placement) -> Affine {
    let sx = p.dst.width() / p.src.width();
    let sy = p.dst.height() / p.src.height();
    Affine::translate(p.dst.origin().to_vec2())
        * Affine::scale_non_uniform(sx, sy)
        * Affine::translate(-p.src.origin().to_vec2())
}

/// Gaussian kernel radius covering three standard deviations.
pub fn blur_radius(sigma: f64) -> u32 {
    if !sigma.is_finite() || sigma <= 0.0 {
        return 0;
    }
    (sigma * 3.0).ceil() as u32
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/geometry.rs"]
mod tests;
