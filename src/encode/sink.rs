use std::path::PathBuf;

use crate::assets::media::AudioPcm;
use crate::compositor::frame::FrameRGBA;
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{ClipError, ClipResult};

/// MIME type of every finished recording.
pub const OUTPUT_MIME: &str = "video/mp4";

/// Streams bound to a recorder at the start of a job.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Video track size.
    pub canvas: Canvas,
    /// Video track frame rate.
    pub fps: Fps,
    /// Mixed audio track covering the whole job, if any.
    pub audio: Option<AudioPcm>,
}

/// What a recorder hands back once the stream is flushed.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingOutput {
    /// Finished file, for file-backed recorders.
    pub path: Option<PathBuf>,
    /// Always [`OUTPUT_MIME`].
    pub mime: &'static str,
    /// Video track size.
    pub canvas: Canvas,
    /// Number of video frames written.
    pub frames: u64,
    /// Video duration implied by `frames` and the frame rate.
    pub duration_secs: f64,
    /// Whether an audio track was muxed.
    pub has_audio: bool,
}

/// Recorder contract: the encoder side of the capture loop.
///
/// `begin` is called once, then `push_frame` with strictly increasing indices, then exactly one
/// of `end` (keep the output) or `abort` (discard everything written so far).
pub trait MediaRecorder: Send {
    /// Bind the video and audio streams and start recording.
    fn begin(&mut self, cfg: StreamConfig) -> ClipResult<()>;
    /// Append one captured frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ClipResult<()>;
    /// Flush and expose the finished output.
    fn end(&mut self) -> ClipResult<RecordingOutput>;
    /// Stop immediately and delete partial output. Safe to call in any state.
    fn abort(&mut self);
}

/// One frame seen by an [`InMemoryRecorder`].
#[derive(Debug, Clone)]
pub struct RecordedFrame {
    /// Frame index as pushed.
    pub idx: FrameIndex,
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Pixels, only when the recorder retains them.
    pub pixels: Option<FrameRGBA>,
}

/// In-memory recorder for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryRecorder {
    cfg: Option<StreamConfig>,
    frames: Vec<RecordedFrame>,
    retain_pixels: bool,
    aborted: bool,
    finished: bool,
}

impl InMemoryRecorder {
    /// Recorder that keeps frame metadata only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder that also keeps a copy of every frame's pixels.
    pub fn retaining_pixels() -> Self {
        Self {
            retain_pixels: true,
            ..Self::default()
        }
    }

    /// Stream configuration captured in `begin`.
    pub fn config(&self) -> Option<&StreamConfig> {
        self.cfg.as_ref()
    }

    /// Frames captured so far.
    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    /// `true` once `abort` discarded the recording.
    pub fn was_aborted(&self) -> bool {
        self.aborted
    }

    /// `true` once `end` completed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl MediaRecorder for InMemoryRecorder {
    fn begin(&mut self, cfg: StreamConfig) -> ClipResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.aborted = false;
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ClipResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ClipError::evaluation("recorder not started"))?;
        if self.frames.last().is_some_and(|last| idx <= last.idx) {
            return Err(ClipError::evaluation(
                "recorder received out-of-order frame index",
            ));
        }
        if frame.canvas() != cfg.canvas {
            return Err(ClipError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.canvas.width, cfg.canvas.height
            )));
        }
        self.frames.push(RecordedFrame {
            idx,
            width: frame.width,
            height: frame.height,
            pixels: self.retain_pixels.then(|| frame.clone()),
        });
        Ok(())
    }

    fn end(&mut self) -> ClipResult<RecordingOutput> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ClipError::evaluation("recorder not started"))?;
        self.finished = true;
        let frames = self.frames.len() as u64;
        Ok(RecordingOutput {
            path: None,
            mime: OUTPUT_MIME,
            canvas: cfg.canvas,
            frames,
            duration_secs: cfg.fps.frames_to_secs(frames),
            has_audio: cfg.audio.is_some(),
        })
    }

    fn abort(&mut self) {
        self.frames.clear();
        self.aborted = true;
    }
}
