//! clipframe is the core of a single-clip short-form video editor.
//!
//! One source video is framed onto a vertical, square or horizontal canvas, decorated with a
//! watermark and a background, mixed with optional music and exported as an H.264/AAC MP4:
//!
//! - Describe the edit as an [`EditSession`] (or load one from JSON)
//! - Preview single frames with [`render_preview`]
//! - Export the trim window through a [`CaptureDriver`] into a [`MediaRecorder`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod foundation;

pub(crate) mod audio;
pub(crate) mod capture;
pub(crate) mod compositor;
/// Recorders: `ffmpeg` MP4 output and an in-memory recorder.
pub mod encode;
/// Single-frame rendering.
pub mod preview;
/// Session model and editor.
pub mod session;

pub use crate::foundation::core::{
    Affine, AspectRatio, Canvas, ExportQuality, Fps, FrameIndex, PREVIEW_HEIGHT, Point, Rect,
    Rgba8Premul, Size, Vec2,
};
pub use crate::foundation::error::{ClipError, ClipResult};

pub use crate::assets::color::ColorDef;
pub use crate::assets::decode::{RasterImage, decode_image, load_image_file};
pub use crate::assets::intake::{IntakeKind, check_intake, mime_for_path, suggested_output_name};
pub use crate::assets::loader::{PendingImage, PendingLoad, load_image_async};
pub use crate::assets::media::{
    AudioPcm, FfmpegFrameReader, MIX_SAMPLE_RATE, SourceMedia, decode_audio_f32_stereo,
    probe_video,
};
pub use crate::assets::text::{FONT_ENV_VAR, FontAsset};
pub use crate::audio::mix::{AudioMixGraph, GainStage};
pub use crate::capture::canvas_capture::{CAPTURE_FPS, CanvasCapture};
pub use crate::capture::clock::{ManualClock, MediaClock, WallClock};
pub use crate::capture::driver::{CancelToken, CaptureDriver, CapturePorts, CaptureState, RenderJob};
pub use crate::capture::player::{AudioLoader, FfmpegAudioLoader, FfmpegPlayer, MediaPlayer};
pub use crate::capture::ticks::{PacedTicks, SteppedTicks, Tick, TickFlow, TickSource, run_ticks};
pub use crate::compositor::cpu::Compositor;
pub use crate::compositor::frame::FrameRGBA;
pub use crate::encode::ffmpeg::{FfmpegRecorder, FfmpegRecorderOpts, is_ffmpeg_on_path};
pub use crate::encode::sink::{
    InMemoryRecorder, MediaRecorder, OUTPUT_MIME, RecordedFrame, RecordingOutput, StreamConfig,
};
pub use crate::preview::{PreviewRenderer, PreviewTier, render_preview};
pub use crate::session::editor::{Editor, EditorMode};
pub use crate::session::model::{
    Anchor, AudioMixSpec, BackgroundSpec, CropSpec, EditSession, LoadedAssets, MAX_ZOOM, MIN_ZOOM,
    MusicSpec, TrimRange, WatermarkContent, WatermarkSpec,
};
