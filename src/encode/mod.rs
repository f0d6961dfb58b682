//! Recorders consume captured canvas frames in capture order and mux them with the mixed audio
//! track.

/// `ffmpeg`-based recorder (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Recorder trait and the in-memory recorder.
pub mod sink;
