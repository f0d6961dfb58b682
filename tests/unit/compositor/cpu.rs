use super::*;
use crate::assets::text::FontAsset;
use crate::foundation::core::{AspectRatio, Rgba8Premul};
use crate::session::model::WatermarkSpec;

fn px(frame: &FrameRGBA, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * frame.width + x) * 4) as usize;
    [
        frame.data[i],
        frame.data[i + 1],
        frame.data[i + 2],
        frame.data[i + 3],
    ]
}

fn fixture_font() -> FontAsset {
    FontAsset::load(std::path::Path::new(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/data/fonts/DejaVuSans.ttf"
    )))
    .unwrap()
}

/// Inclusive pixel bounds `(min_x, min_y, max_x, max_y)` of every pixel with a lit red channel.
fn ink_bounds(frame: &FrameRGBA) -> Option<(u32, u32, u32, u32)> {
    let mut out: Option<(u32, u32, u32, u32)> = None;
    for y in 0..frame.height {
        for x in 0..frame.width {
            if px(frame, x, y)[0] == 0 {
                continue;
            }
            out = Some(match out {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }
    out
}

/// Laid-out width of `text` at the watermark font size for a canvas of height `h`.
fn text_width(font: &FontAsset, text: &str, h: u32) -> f64 {
    let size = watermark_font_size(f64::from(h)) as f32;
    let layout = TextLayoutEngine::new()
        .layout_line(text, font, size, TextBrushRgba8::default())
        .unwrap();
    f64::from(layout.width())
}

fn solid(w: u32, h: u32, rgba: [u8; 4]) -> RasterImage {
    RasterImage::solid(w, h, Rgba8Premul::from_straight_rgba(rgba[0], rgba[1], rgba[2], rgba[3]))
        .unwrap()
}

fn canvas(w: u32, h: u32) -> FrameRGBA {
    FrameRGBA::new(Canvas {
        width: w,
        height: h,
    })
}

#[test]
fn color_background_fills_every_pixel() {
    let mut c = Compositor::new();
    let mut frame = canvas(32, 18);
    let session = EditSession::default().with_background(BackgroundSpec::Color {
        value: ColorDef::from_hex("#336699").unwrap(),
    });
    c.composite(&mut frame, None, &session, &LoadedAssets::default())
        .unwrap();
    assert!(
        frame
            .data
            .chunks_exact(4)
            .all(|p| p == [0x33, 0x66, 0x99, 255])
    );
}

#[test]
fn zoom_out_keeps_background_visible_at_the_edges() {
    let mut c = Compositor::new();
    let mut frame = canvas(64, 64);
    let video = solid(160, 90, [255, 0, 0, 255]);
    let session = EditSession::default().with_zoom(0.5);
    c.composite(&mut frame, Some(&video), &session, &LoadedAssets::default())
        .unwrap();

    assert_eq!(px(&frame, 1, 1), [0, 0, 0, 255]);
    assert_eq!(px(&frame, 62, 62), [0, 0, 0, 255]);
    assert_eq!(px(&frame, 32, 32), [255, 0, 0, 255]);
}

#[test]
fn zoom_in_covers_the_whole_canvas() {
    let mut c = Compositor::new();
    let mut frame = canvas(48, 64);
    let video = solid(160, 90, [0, 255, 0, 255]);
    let session = EditSession::default().with_zoom(2.0);
    c.composite(&mut frame, Some(&video), &session, &LoadedAssets::default())
        .unwrap();
    assert!(
        frame
            .data
            .chunks_exact(4)
            .all(|p| p[0] == 0 && p[1] >= 254 && p[2] == 0 && p[3] >= 254)
    );
}

#[test]
fn image_watermark_lands_bottom_right_with_opacity() {
    let mut c = Compositor::new();
    let mut frame = canvas(108, 192);
    let session = EditSession::default().with_watermark(Some(
        WatermarkSpec::image("logo.png", 20.0)
            .at(Anchor::BottomRight)
            .with_opacity(0.7),
    ));
    let assets = LoadedAssets {
        watermark_image: Some(solid(10, 10, [255, 255, 255, 255])),
        ..LoadedAssets::default()
    };
    c.composite(&mut frame, None, &session, &assets).unwrap();

    // Box is 21.6 px square, 4 px from the right and bottom edges.
    assert_eq!(px(&frame, 93, 177), [179, 179, 179, 255]);
    assert_eq!(px(&frame, 106, 177), [0, 0, 0, 255]);
    assert_eq!(px(&frame, 93, 190), [0, 0, 0, 255]);
    assert_eq!(px(&frame, 10, 10), [0, 0, 0, 255]);
}

#[test]
fn unloaded_watermark_image_draws_nothing() {
    let mut c = Compositor::new();
    let mut frame = canvas(40, 40);
    let session = EditSession::default()
        .with_watermark(Some(WatermarkSpec::image("logo.png", 50.0).at(Anchor::Center)));
    c.composite(&mut frame, None, &session, &LoadedAssets::default())
        .unwrap();
    assert!(frame.data.chunks_exact(4).all(|p| p == [0, 0, 0, 255]));
}

#[test]
fn blank_text_watermark_draws_nothing() {
    let mut c = Compositor::new();
    let mut frame = canvas(40, 40);
    let session = EditSession::default().with_watermark(Some(WatermarkSpec::text("   ")));
    let assets = LoadedAssets {
        font: Some(fixture_font()),
        ..LoadedAssets::default()
    };
    c.composite(&mut frame, None, &session, &assets).unwrap();
    assert!(frame.data.chunks_exact(4).all(|p| p == [0, 0, 0, 255]));
}

#[test]
fn unloaded_background_image_leaves_canvas_transparent() {
    let mut c = Compositor::new();
    let mut frame = canvas(20, 20);
    let session = EditSession::default().with_background(BackgroundSpec::Image {
        source: "bg.png".into(),
        blur_px: 4.0,
    });
    c.composite(&mut frame, None, &session, &LoadedAssets::default())
        .unwrap();
    assert!(frame.data.iter().all(|&b| b == 0));
}

#[test]
fn background_is_cover_cropped_before_blur() {
    // Red | blue band | red. The 9:16 cover crop of this 200x100 source only keeps the band,
    // so nothing red may reach the canvas. Blurring the uncropped source would bleed red in.
    let (w, h) = (200u32, 100u32);
    let mut bytes = Vec::with_capacity((w * h * 4) as usize);
    for _y in 0..h {
        for x in 0..w {
            if (70..130).contains(&x) {
                bytes.extend_from_slice(&[0, 0, 255, 255]);
            } else {
                bytes.extend_from_slice(&[255, 0, 0, 255]);
            }
        }
    }
    let bg = RasterImage::from_premul(w, h, bytes).unwrap();

    let mut c = Compositor::new();
    let mut frame = FrameRGBA::new(Canvas::for_preview(AspectRatio::Portrait9x16));
    assert_eq!((frame.width, frame.height), (480, 853));
    let session = EditSession::default().with_background(BackgroundSpec::Image {
        source: "bg.png".into(),
        blur_px: 8.0,
    });
    let assets = LoadedAssets {
        background_image: Some(bg),
        ..LoadedAssets::default()
    };
    c.composite(&mut frame, None, &session, &assets).unwrap();

    for p in frame.data.chunks_exact(4) {
        assert!(p[0] <= 2, "red leaked into {p:?}");
        assert!(p[2] >= 250);
    }
}

#[test]
fn compositing_is_idempotent_and_caches_are_invisible() {
    let mut c = Compositor::new();
    let video = solid(64, 36, [10, 200, 30, 255]);
    let base = EditSession::default()
        .with_zoom(1.5)
        .with_background(BackgroundSpec::Image {
            source: "bg.png".into(),
            blur_px: 2.0,
        })
        .with_watermark(Some(
            WatermarkSpec::image("logo.png", 30.0)
                .at(Anchor::TopLeft)
                .with_opacity(0.5)
                .with_rotation(30.0)
                .with_blur(1.5),
        ));
    let assets = LoadedAssets {
        watermark_image: Some(solid(8, 4, [255, 255, 0, 255])),
        background_image: Some(solid(30, 30, [0, 0, 128, 255])),
        font: None,
    };

    let mut first = canvas(90, 160);
    c.composite(&mut first, Some(&video), &base, &assets).unwrap();
    let mut second = canvas(90, 160);
    c.composite(&mut second, Some(&video), &base, &assets).unwrap();
    assert_eq!(first, second);

    let mut other = canvas(90, 160);
    let changed = base.clone().with_zoom(0.6);
    c.composite(&mut other, Some(&video), &changed, &assets)
        .unwrap();
    assert_ne!(first, other);

    let mut third = canvas(90, 160);
    c.composite(&mut third, Some(&video), &base, &assets).unwrap();
    assert_eq!(first, third);

    let mut fresh = canvas(90, 160);
    Compositor::new()
        .composite(&mut fresh, Some(&video), &base, &assets)
        .unwrap();
    assert_eq!(first, fresh);
}

#[test]
fn my_short_text_watermark_at_export_resolution() {
    let font = fixture_font();
    let width = text_width(&font, "@MyShort", 1920);
    let mut c = Compositor::new();
    let mut frame = canvas(1080, 1920);
    let session = EditSession::default().with_watermark(Some(
        WatermarkSpec::text("@MyShort")
            .at(Anchor::BottomRight)
            .with_opacity(0.7),
    ));
    let assets = LoadedAssets {
        font: Some(font),
        ..LoadedAssets::default()
    };
    c.composite(&mut frame, None, &session, &assets).unwrap();

    let max_lit = frame.data.chunks_exact(4).map(|p| p[0]).max().unwrap();
    // White at alpha 0.7 over black.
    assert_eq!(max_lit, 179);

    // 77 px font, 38.5 px margin: the box spans [1041.5 - width, 1041.5] x [1804.5, 1881.5].
    let (min_x, min_y, max_x, max_y) = ink_bounds(&frame).unwrap();
    let box_left = 1041.5 - width;
    assert!(width > 300.0, "text measured {width} px wide");
    assert!(f64::from(min_x) >= box_left.floor() - 1.0, "ink starts at x={min_x}");
    assert!(f64::from(min_x) < box_left + 20.0, "ink starts at x={min_x}");
    assert!(max_x <= 1042, "ink reaches x={max_x}");
    assert!(max_x > 1015, "ink reaches x={max_x}");
    // Ascenders sit below the box top; the baseline sits a few px above its bottom
    // and the descender of `y` hangs below it, inside the line height.
    assert!(min_y >= 1804, "ink starts at y={min_y}");
    assert!(min_y < 1804 + 38, "ink starts at y={min_y}");
    assert!(max_y > 1881, "ink ends at y={max_y}");
    assert!(max_y < 1804 + 92, "ink ends at y={max_y}");
}

#[test]
fn text_watermark_fills_its_box_at_top_left() {
    let font = fixture_font();
    let width = text_width(&font, "HHHH", 1920);
    let mut c = Compositor::new();
    let mut frame = canvas(1080, 1920);
    let session = EditSession::default()
        .with_watermark(Some(WatermarkSpec::text("HHHH").at(Anchor::TopLeft)));
    let assets = LoadedAssets {
        font: Some(font),
        ..LoadedAssets::default()
    };
    c.composite(&mut frame, None, &session, &assets).unwrap();

    // Box: [38.5, 38.5 + width] x [38.5, 115.5]. Capitals have no descenders.
    let (min_x, min_y, max_x, max_y) = ink_bounds(&frame).unwrap();
    assert!(min_x >= 38 && min_x < 50, "ink starts at x={min_x}");
    assert!(f64::from(max_x) <= 39.5 + width, "ink reaches x={max_x}");
    assert!(f64::from(max_x) > 38.5 + width - 20.0, "ink reaches x={max_x}");
    assert!(min_y >= 38 && min_y < 70, "ink starts at y={min_y}");
    assert!(max_y > 95 && max_y <= 116, "ink ends at y={max_y}");
    // Four capitals at 77 px cover far more than a sliver.
    let lit = frame.data.chunks_exact(4).filter(|p| p[0] > 0).count();
    assert!(lit > 4 * 800, "only {lit} px lit");
}
