use super::*;
use crate::session::model::Anchor;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("clipframe_editor_{}_{name}", std::process::id()))
}

fn write_png(name: &str, w: u32, h: u32) -> PathBuf {
    let path = temp_path(name);
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]));
    img.save(&path).unwrap();
    path
}

fn media(path: &str) -> SourceMedia {
    SourceMedia {
        path: PathBuf::from(path),
        width: 1920,
        height: 1080,
        fps_num: 30,
        fps_den: 1,
        duration_sec: 12.0,
        has_audio: true,
    }
}

#[test]
fn wrong_mime_is_rejected_without_touching_state() {
    let mut ed = Editor::new();
    ed.set_source(media("holiday.mov"));
    let before = ed.session().clone();

    let err = ed
        .load_video(Path::new("notes.txt"), "text/plain")
        .unwrap_err();
    assert!(matches!(err, ClipError::InvalidInput(_)));
    assert!(matches!(
        ed.load_watermark_image(Path::new("a.mp4"), "video/mp4"),
        Err(ClipError::InvalidInput(_))
    ));
    assert!(matches!(
        ed.load_background_image(Path::new("a.mp3"), "audio/mpeg"),
        Err(ClipError::InvalidInput(_))
    ));
    assert!(matches!(
        ed.set_music(Path::new("a.png"), "image/png"),
        Err(ClipError::InvalidInput(_))
    ));
    assert_eq!(ed.session(), &before);
    assert!(!ed.has_pending_loads());
}

#[test]
fn set_source_resets_trim_and_names_output() {
    let mut ed = Editor::new();
    ed.set_source(media("clips/holiday.mov"));
    ed.update(|s| s.with_trim(1.0, 4.0)).unwrap();
    ed.set_source(media("clips/beach.mp4"));
    assert_eq!(ed.session().trim, None);
    assert_eq!(ed.suggested_output_name(), "beach_edited.mp4");
}

#[test]
fn update_rejects_invalid_sessions() {
    let mut ed = Editor::new();
    let err = ed
        .update(|s| s.with_watermark(Some(WatermarkSpec::text("x").with_opacity(2.0))))
        .unwrap_err();
    assert!(matches!(err, ClipError::Validation(_)));
    assert!(ed.session().watermark.is_none());
}

#[test]
fn watermark_image_installs_after_load_and_keeps_filters() {
    let path = write_png("wm.png", 8, 4);
    let mut ed = Editor::new();
    ed.update(|s| {
        s.with_watermark(Some(
            WatermarkSpec::text("hi")
                .at(Anchor::TopLeft)
                .with_opacity(0.4),
        ))
    })
    .unwrap();
    ed.load_watermark_image(&path, "image/png").unwrap();
    ed.wait_assets().unwrap();

    let img = ed.assets().watermark_image.as_ref().unwrap();
    assert_eq!((img.width(), img.height()), (8, 4));
    let wm = ed.session().watermark.as_ref().unwrap();
    assert_eq!(wm.anchor, Anchor::TopLeft);
    assert_eq!(wm.opacity, 0.4);
    assert!(matches!(
        &wm.content,
        WatermarkContent::Image { source, size_percent } if source == &path && *size_percent == 20.0
    ));
    let _ = std::fs::remove_file(path);
}

#[test]
fn switching_to_text_before_the_image_lands_keeps_the_text() {
    let path = write_png("wm_late.png", 8, 4);
    let mut ed = Editor::new();
    ed.load_watermark_image(&path, "image/png").unwrap();
    ed.update(|s| s.with_watermark(Some(WatermarkSpec::text("@MyShort"))))
        .unwrap();
    ed.wait_assets().unwrap();

    assert!(!ed.has_pending_loads());
    assert!(ed.assets().watermark_image.is_none());
    let wm = ed.session().watermark.as_ref().unwrap();
    assert!(matches!(&wm.content, WatermarkContent::Text { content, .. } if content == "@MyShort"));
    let _ = std::fs::remove_file(path);
}

#[test]
fn background_color_picked_during_load_wins() {
    let path = write_png("bg_late.png", 4, 4);
    let mut ed = Editor::new();
    ed.load_background_image(&path, "image/png").unwrap();
    let white = BackgroundSpec::Color {
        value: ColorDef::white(),
    };
    ed.update(|s| s.with_background(white.clone())).unwrap();
    ed.wait_assets().unwrap();

    assert_eq!(ed.session().background, white);
    assert!(ed.assets().background_image.is_none());
    let _ = std::fs::remove_file(path);
}

#[test]
fn failed_background_load_keeps_previous_asset() {
    let good = write_png("bg.png", 4, 4);
    let bad = temp_path("broken.png");
    std::fs::write(&bad, b"not a png").unwrap();

    let mut ed = Editor::new();
    ed.load_background_image(&good, "image/png").unwrap();
    ed.wait_assets().unwrap();
    let before = ed.session().background.clone();

    ed.load_background_image(&bad, "image/png").unwrap();
    let err = ed.wait_assets().unwrap_err();
    assert!(matches!(err, ClipError::AssetLoad(_)));
    assert_eq!(ed.session().background, before);
    assert!(ed.assets().background_image.is_some());
    assert!(!ed.has_pending_loads());

    let _ = std::fs::remove_file(good);
    let _ = std::fs::remove_file(bad);
}

#[test]
fn music_keeps_previous_volume() {
    let mut ed = Editor::new();
    ed.set_music(Path::new("a.mp3"), "audio/mpeg").unwrap();
    ed.update(|mut s| {
        if let Some(m) = s.audio.music.as_mut() {
            m.volume = 0.8;
        }
        s
    })
    .unwrap();
    ed.set_music(Path::new("b.wav"), "audio/wav").unwrap();
    let music = ed.session().audio.music.as_ref().unwrap();
    assert_eq!(music.source, PathBuf::from("b.wav"));
    assert_eq!(music.volume, 0.8);
}

#[test]
fn reset_releases_everything() {
    let mut ed = Editor::new();
    ed.set_source(media("x.mp4"));
    ed.set_music(Path::new("a.mp3"), "audio/mpeg").unwrap();
    ed.reset();
    assert!(ed.media().is_none());
    assert_eq!(ed.session(), &EditSession::default());
    assert_eq!(ed.mode(), EditorMode::Editing);
}
