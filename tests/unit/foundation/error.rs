use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ClipError::invalid_input("x")
            .to_string()
            .contains("invalid input:")
    );
    assert!(
        ClipError::asset_load("x")
            .to_string()
            .contains("asset load failure:")
    );
    assert!(
        ClipError::playback_start("x")
            .to_string()
            .contains("playback start failure:")
    );
    assert!(
        ClipError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        ClipError::evaluation("x")
            .to_string()
            .contains("evaluation error:")
    );
}

#[test]
fn invalid_range_reports_both_bounds() {
    let msg = ClipError::InvalidRange {
        start: 5.0,
        end: 2.5,
    }
    .to_string();
    assert!(msg.contains("5.000"));
    assert!(msg.contains("2.500"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ClipError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
