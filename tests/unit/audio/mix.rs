use super::*;

fn stereo(sample_rate: u32, frames: usize, value: f32) -> AudioPcm {
    AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32: vec![value; frames * 2],
    }
}

#[test]
fn empty_graph_mixes_to_silence_of_full_length() {
    let graph = AudioMixGraph::open(48_000).unwrap();
    let out = graph.mixdown(2.0);
    assert_eq!(out.channels, 2);
    assert_eq!(out.frames(), 96_000);
    assert!(out.interleaved_f32.iter().all(|&s| s == 0.0));
    graph.release();
}

#[test]
fn zero_video_volume_yields_silent_track() {
    let mut graph = AudioMixGraph::open(48_000).unwrap();
    graph.connect("video", stereo(48_000, 48_000, 0.8), 0.0).unwrap();
    let out = graph.mixdown(1.0);
    assert_eq!(out.frames(), 48_000);
    assert!(out.interleaved_f32.iter().all(|&s| s == 0.0));
}

#[test]
fn stages_are_scaled_summed_and_clamped() {
    let mut graph = AudioMixGraph::open(1000).unwrap();
    graph.connect("video", stereo(1000, 1000, 0.5), 0.5).unwrap();
    graph.connect("music", stereo(1000, 1000, 0.5), 1.0).unwrap();
    let out = graph.mixdown(1.0);
    assert!((out.interleaved_f32[10] - 0.75).abs() < 1e-6);

    let mut loud = AudioMixGraph::open(1000).unwrap();
    loud.connect("a", stereo(1000, 10, 0.9), 1.0).unwrap();
    loud.connect("b", stereo(1000, 10, 0.9), 1.0).unwrap();
    assert_eq!(loud.mixdown(0.01).interleaved_f32[0], 1.0);
}

#[test]
fn short_sources_leave_trailing_silence() {
    let mut graph = AudioMixGraph::open(100).unwrap();
    graph.connect("music", stereo(100, 50, 0.3), 1.0).unwrap();
    let out = graph.mixdown(1.0);
    assert_eq!(out.frames(), 100);
    assert!((out.interleaved_f32[0] - 0.3).abs() < 1e-6);
    assert_eq!(out.interleaved_f32[199], 0.0);
}

#[test]
fn mono_sources_are_upmixed_and_resampled() {
    let mut graph = AudioMixGraph::open(200).unwrap();
    let mono = AudioPcm {
        sample_rate: 100,
        channels: 1,
        interleaved_f32: (0..100).map(|i| i as f32 / 100.0).collect(),
    };
    graph.connect("music", mono, 1.0).unwrap();
    let out = graph.mixdown(0.5);
    // Frame 3 at 200 Hz sits halfway between source frames 1 and 2.
    assert!((out.interleaved_f32[6] - 0.015).abs() < 1e-6);
    assert_eq!(out.interleaved_f32[6], out.interleaved_f32[7]);
}

#[test]
fn gains_are_clamped_and_bad_sources_rejected() {
    let mut graph = AudioMixGraph::open(10).unwrap();
    graph.connect("x", stereo(10, 1, 0.1), 7.0).unwrap();
    assert_eq!(graph.stages()[0].gain(), 1.0);
    let bad = AudioPcm {
        sample_rate: 10,
        channels: 6,
        interleaved_f32: vec![0.0; 6],
    };
    assert!(graph.connect("surround", bad, 1.0).is_err());
    assert!(AudioMixGraph::open(0).is_err());
}

#[test]
fn f32le_writer_emits_little_endian_samples() {
    let dir = std::env::temp_dir().join(format!("clipframe_mix_{}", std::process::id()));
    let path = dir.join("mix.f32le");
    write_mix_to_f32le_file(&[1.0, -0.5], &path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 8);
    assert_eq!(f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), -0.5);
    let _ = std::fs::remove_dir_all(&dir);
}
