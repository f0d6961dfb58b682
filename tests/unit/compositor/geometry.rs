use super::*;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn rect_close(a: Rect, b: Rect) -> bool {
    close(a.x0, b.x0) && close(a.y0, b.y0) && close(a.x1, b.x1) && close(a.y1, b.y1)
}

#[test]
fn cover_crop_trims_the_relatively_wider_axis() {
    // 16:9 source into a 9:16 canvas loses width.
    let crop = cover_crop(Size::new(1920.0, 1080.0), Size::new(1080.0, 1920.0));
    assert!(close(crop.height(), 1080.0));
    assert!(close(crop.width(), 1080.0 * 9.0 / 16.0));
    assert!(close(crop.center().x, 960.0));

    // Tall source into a square canvas loses height.
    let crop = cover_crop(Size::new(400.0, 1000.0), Size::new(500.0, 500.0));
    assert!(rect_close(crop, Rect::new(0.0, 300.0, 400.0, 700.0)));
}

#[test]
fn cover_crop_of_matching_aspect_is_whole_source() {
    let crop = cover_crop(Size::new(640.0, 360.0), Size::new(1920.0, 1080.0));
    assert!(rect_close(crop, Rect::new(0.0, 0.0, 640.0, 360.0)));
}

#[test]
fn zoom_at_or_above_one_always_fills_the_canvas() {
    let src = Size::new(1920.0, 1080.0);
    let canvas = Size::new(1080.0, 1920.0);
    for zoom in [1.0, 1.25, 2.0, 3.0] {
        let p = video_placement(src, canvas, zoom);
        assert!(rect_close(p.dst, canvas.to_rect()), "zoom {zoom}");
        let base = cover_crop(src, canvas);
        assert!(close(p.src.width(), base.width() / zoom));
        assert!(close(p.src.height(), base.height() / zoom));
        assert!(close(p.src.center().x, base.center().x));
        assert!(close(p.src.center().y, base.center().y));
    }
}

#[test]
fn zoom_below_one_shrinks_and_centers_the_destination() {
    let src = Size::new(1280.0, 720.0);
    let canvas = Size::new(1080.0, 1080.0);
    for zoom in [0.5, 0.75, 0.9] {
        let p = video_placement(src, canvas, zoom);
        assert!(close(p.dst.width(), canvas.width * zoom));
        assert!(close(p.dst.height(), canvas.height * zoom));
        assert!(close(p.dst.center().x, 540.0));
        assert!(close(p.dst.center().y, 540.0));
        assert!(rect_close(p.src, cover_crop(src, canvas)));
    }
}

#[test]
fn font_size_and_margin_follow_canvas_height() {
    assert!(close(watermark_font_size(1920.0), 77.0));
    assert!(close(watermark_margin(1920.0), 38.5));
    assert!(close(watermark_font_size(853.0), 34.0));
    assert!(close(watermark_font_size(3840.0), 154.0));
}

#[test]
fn every_corner_anchor_keeps_the_margin() {
    let canvas = Size::new(1080.0, 1920.0);
    let bx = Size::new(300.0, 77.0);
    let margin = watermark_margin(canvas.height);
    for anchor in Anchor::ALL {
        let r = watermark_box(anchor, bx, canvas);
        match anchor {
            Anchor::TopLeft => {
                assert!(close(r.x0, margin) && close(r.y0, margin));
            }
            Anchor::TopRight => {
                assert!(close(canvas.width - r.x1, margin) && close(r.y0, margin));
            }
            Anchor::BottomLeft => {
                assert!(close(r.x0, margin) && close(canvas.height - r.y1, margin));
            }
            Anchor::BottomRight => {
                assert!(close(canvas.width - r.x1, margin));
                assert!(close(canvas.height - r.y1, margin));
            }
            Anchor::Center => {
                assert!(close(r.x0, canvas.width - r.x1));
                assert!(close(r.y0, canvas.height - r.y1));
            }
        }
    }
}

#[test]
fn image_watermark_box_keeps_asset_aspect() {
    let bx = image_watermark_size(1080.0, 20.0, 2.0);
    assert!(close(bx.width, 216.0));
    assert!(close(bx.height, 108.0));
    assert_eq!(image_watermark_size(1080.0, 20.0, 0.0), Size::ZERO);
}

#[test]
fn rotation_pivots_on_box_center() {
    let bx = Rect::new(10.0, 20.0, 110.0, 60.0);
    let t = rotation_about_center(bx, 90.0);
    let c = t * bx.center();
    assert!(close(c.x, bx.center().x) && close(c.y, bx.center().y));
    // Clockwise on a y-down canvas: the right edge midpoint moves down.
    let p = t * Point::new(bx.x1, bx.center().y);
    assert!(close(p.x, bx.center().x));
    assert!(p.y > bx.center().y);
}

#[test]
fn placement_transform_maps_src_corners_to_dst_corners() {
    let p = Placement {
        src: Rect::new(100.0, 50.0, 300.0, 150.0),
        dst: Rect::new(0.0, 0.0, 1000.0, 500.0),
    };
    let t = placement_transform(p);
    let a = t * Point::new(100.0, 50.0);
    let b = t * Point::new(300.0, 150.0);
    assert!(close(a.x, 0.0) && close(a.y, 0.0));
    assert!(close(b.x, 1000.0) && close(b.y, 500.0));
}

#[test]
fn blur_radius_is_three_sigma() {
    assert_eq!(blur_radius(0.0), 0);
    assert_eq!(blur_radius(8.0), 24);
    assert_eq!(blur_radius(0.4), 2);
    assert_eq!(blur_radius(f64::NAN), 0);
}
