use super::*;

const FIXTURE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/data/fonts/DejaVuSans.ttf"
);

#[test]
fn explicit_path_wins_over_lookup() {
    let font = FontAsset::resolve(Some(Path::new(FIXTURE))).unwrap();
    assert_eq!(font.path(), Path::new(FIXTURE));
    assert_eq!(font.index(), 0);
    assert!(font.bytes().len() > 1000);
}

#[test]
fn missing_font_file_is_asset_load() {
    let err = FontAsset::resolve(Some(Path::new("/nonexistent/font.ttf"))).unwrap_err();
    assert!(matches!(err, ClipError::AssetLoad(_)));
    assert!(err.to_string().contains("font.ttf"));
}

#[test]
fn layout_width_grows_with_text() {
    let font = FontAsset::load(Path::new(FIXTURE)).unwrap();
    let mut engine = TextLayoutEngine::new();
    let short = engine
        .layout_line("@My", &font, 77.0, TextBrushRgba8::default())
        .unwrap();
    let long = engine
        .layout_line("@MyShort", &font, 77.0, TextBrushRgba8::default())
        .unwrap();
    assert!(short.width() > 0.0);
    assert!(long.width() > short.width() * 2.0);
    assert!(long.height() >= 77.0);
}

#[test]
fn layout_rejects_non_positive_size() {
    let font = FontAsset::load(Path::new(FIXTURE)).unwrap();
    let mut engine = TextLayoutEngine::new();
    for size in [0.0, -4.0, f32::NAN] {
        let err = engine
            .layout_line("x", &font, size, TextBrushRgba8::default())
            .err().expect("expected layout_line to fail");
        assert!(matches!(err, ClipError::Validation(_)));
    }
}

#[test]
fn system_lookup_yields_a_readable_face() {
    // Hosts without any installed font legitimately return None.
    if let Some(font) = FontAsset::find_system() {
        assert!(!font.bytes().is_empty());
        let mut engine = TextLayoutEngine::new();
        let layout = engine
            .layout_line("@MyShort", &font, 40.0, TextBrushRgba8::default())
            .unwrap();
        assert!(layout.width() > 0.0);
    }
}
