use std::path::PathBuf;

use super::*;
use crate::capture::clock::ManualClock;

fn media(duration_sec: f64) -> SourceMedia {
    SourceMedia {
        path: PathBuf::from("clip.mp4"),
        width: 64,
        height: 36,
        fps_num: 30,
        fps_den: 1,
        duration_sec,
        has_audio: false,
    }
}

#[test]
fn position_follows_the_clock_only_while_playing() {
    let clock = ManualClock::new();
    let mut p = FfmpegPlayer::from_media(media(10.0), Box::new(clock.clone()));
    p.seek(2.0).unwrap();
    clock.advance(Duration::from_secs(1));
    assert_eq!(p.position(), 2.0);

    p.play().unwrap();
    clock.advance(Duration::from_millis(500));
    assert!((p.position() - 2.5).abs() < 1e-9);

    p.pause();
    clock.advance(Duration::from_secs(3));
    assert!((p.position() - 2.5).abs() < 1e-9);
    assert!(!p.is_playing());
}

#[test]
fn playback_stops_at_the_end_of_the_source() {
    let clock = ManualClock::new();
    let mut p = FfmpegPlayer::from_media(media(1.0), Box::new(clock.clone()));
    p.play().unwrap();
    clock.advance(Duration::from_secs(5));
    assert!(!p.is_playing());
    assert_eq!(p.position(), 1.0);
}

#[test]
fn play_at_end_is_a_playback_start_failure() {
    let mut p = FfmpegPlayer::from_media(media(1.0), Box::new(ManualClock::new()));
    p.seek(1.0).unwrap();
    assert!(matches!(p.play(), Err(ClipError::PlaybackStart(_))));
}

#[test]
fn seek_clamps_and_rejects_nan() {
    let mut p = FfmpegPlayer::from_media(media(4.0), Box::new(ManualClock::new()));
    p.seek(-3.0).unwrap();
    assert_eq!(p.position(), 0.0);
    p.seek(99.0).unwrap();
    assert_eq!(p.position(), 4.0);
    assert!(p.seek(f64::NAN).is_err());
}

#[test]
fn volume_is_clamped_and_independent_of_mute() {
    let mut p = FfmpegPlayer::from_media(media(4.0), Box::new(ManualClock::new()));
    p.set_volume(1.7);
    assert_eq!(p.volume(), 1.0);
    p.set_muted(true);
    p.set_volume(0.0);
    assert!(p.muted());
    assert_eq!(p.volume(), 0.0);
}

#[test]
fn source_without_audio_yields_none() {
    let mut p = FfmpegPlayer::from_media(media(4.0), Box::new(ManualClock::new()));
    let pcm = p
        .source_audio(TrimRange {
            start: 0.0,
            end: 1.0,
        })
        .unwrap();
    assert!(pcm.is_none());
}

#[test]
fn missing_music_file_is_an_asset_load_failure() {
    let err = FfmpegAudioLoader
        .load(Path::new("definitely/not/here.mp3"))
        .unwrap_err();
    assert!(matches!(err, ClipError::AssetLoad(_)));
}
