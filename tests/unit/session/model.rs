use super::*;

#[test]
fn empty_json_gives_defaults() {
    let s = EditSession::from_json_str("{}").unwrap();
    assert_eq!(s, EditSession::default());
    assert_eq!(s.aspect, AspectRatio::Portrait9x16);
    assert_eq!(s.crop.zoom, 1.0);
    assert_eq!(s.background, BackgroundSpec::default());
    assert_eq!(s.audio.video_volume, 1.0);
    assert!(s.watermark.is_none());
}

#[test]
fn full_session_json_parses() {
    let json = r##"{
        "video": "clip.mp4",
        "aspect": "16:9",
        "crop": { "zoom": 1.5 },
        "quality": "upscaled",
        "watermark": {
            "kind": "text",
            "content": "@MyShort",
            "anchor": "bottom-right",
            "opacity": 0.7
        },
        "background": { "kind": "image", "source": "bg.jpg", "blur_px": 8 },
        "trim": { "start": 1.0, "end": 6.0 },
        "audio": { "video_volume": 0.25, "music": { "source": "song.mp3", "volume": 0.8 } }
    }"##;
    let s = EditSession::from_json_str(json).unwrap();
    assert_eq!(s.aspect, AspectRatio::Landscape16x9);
    assert_eq!(s.quality, ExportQuality::Upscaled);
    let wm = s.watermark.as_ref().unwrap();
    assert_eq!(wm.anchor, Anchor::BottomRight);
    assert_eq!(wm.opacity, 0.7);
    assert!(matches!(
        &wm.content,
        WatermarkContent::Text { content, color }
            if content == "@MyShort" && *color == ColorDef::white()
    ));
    assert!(matches!(s.background, BackgroundSpec::Image { blur_px, .. } if blur_px == 8.0));
    assert_eq!(s.trim, Some(TrimRange { start: 1.0, end: 6.0 }));
    assert_eq!(s.audio.music.as_ref().unwrap().volume, 0.8);
    s.validate().unwrap();
}

#[test]
fn image_watermark_defaults_size() {
    let s = EditSession::from_json_str(
        r#"{ "watermark": { "kind": "image", "source": "logo.png", "anchor": "center" } }"#,
    )
    .unwrap();
    let wm = s.watermark.unwrap();
    assert!(matches!(
        wm.content,
        WatermarkContent::Image { size_percent, .. } if size_percent == 20.0
    ));
    assert_eq!(wm.opacity, 1.0);
}

#[test]
fn malformed_json_is_a_validation_error() {
    let err = EditSession::from_json_str("{ \"aspect\": \"4:3\" }").unwrap_err();
    assert!(matches!(err, ClipError::Validation(_)));
}

#[test]
fn relative_paths_resolve_against_root() {
    let s = EditSession::default()
        .with_video("clip.mp4")
        .with_background(BackgroundSpec::Image {
            source: "/abs/bg.png".into(),
            blur_px: 0.0,
        })
        .resolve_paths(Path::new("/work"));
    assert_eq!(s.video.as_deref(), Some(Path::new("/work/clip.mp4")));
    assert!(matches!(
        &s.background,
        BackgroundSpec::Image { source, .. } if source == Path::new("/abs/bg.png")
    ));
}

#[test]
fn zoom_is_clamped_to_offered_range() {
    assert_eq!(CropSpec { zoom: 0.1 }.effective_zoom(), MIN_ZOOM);
    assert_eq!(CropSpec { zoom: 9.0 }.effective_zoom(), MAX_ZOOM);
    assert_eq!(CropSpec { zoom: 1.7 }.effective_zoom(), 1.7);
    assert_eq!(CropSpec { zoom: f64::NAN }.effective_zoom(), 1.0);
}

#[test]
fn trim_validation_rejects_empty_and_inverted_ranges() {
    assert!(TrimRange { start: 0.0, end: 5.0 }.validate().is_ok());
    for (start, end) in [(5.0, 5.0), (6.0, 2.0)] {
        let err = TrimRange { start, end }.validate().unwrap_err();
        assert!(matches!(err, ClipError::InvalidRange { .. }));
    }
}

#[test]
fn resolved_trim_defaults_to_whole_clip_and_clamps() {
    let s = EditSession::default();
    assert_eq!(s.resolved_trim(12.5), TrimRange { start: 0.0, end: 12.5 });
    let s = s.with_trim(-1.0, 40.0);
    assert_eq!(s.resolved_trim(12.5), TrimRange { start: 0.0, end: 12.5 });
}

#[test]
fn progress_is_clamped_to_unit_interval() {
    let t = TrimRange { start: 2.0, end: 4.0 };
    assert_eq!(t.progress_at(1.0), 0.0);
    assert_eq!(t.progress_at(3.0), 0.5);
    assert_eq!(t.progress_at(9.0), 1.0);
}

#[test]
fn validate_rejects_out_of_range_settings() {
    let bad_opacity =
        EditSession::default().with_watermark(Some(WatermarkSpec::text("x").with_opacity(1.5)));
    assert!(bad_opacity.validate().is_err());

    let bad_blur =
        EditSession::default().with_watermark(Some(WatermarkSpec::text("x").with_blur(-1.0)));
    assert!(bad_blur.validate().is_err());

    let bad_volume = EditSession::default().with_audio(AudioMixSpec {
        video_volume: 2.0,
        music: None,
    });
    assert!(bad_volume.validate().is_err());
}

#[test]
fn with_video_resets_trim() {
    let s = EditSession::default()
        .with_trim(1.0, 2.0)
        .with_video("other.mp4");
    assert!(s.trim.is_none());
}

#[test]
fn session_round_trips_through_json() {
    let s = EditSession::default()
        .with_aspect(AspectRatio::Square1x1)
        .with_watermark(Some(WatermarkSpec::image("logo.png", 15.0).at(Anchor::TopLeft)));
    let json = serde_json::to_string(&s).unwrap();
    assert_eq!(EditSession::from_json_str(&json).unwrap(), s);
}
