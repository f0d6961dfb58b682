use crate::compositor::frame::FrameRGBA;
use crate::encode::sink::MediaRecorder;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::ClipResult;

/// Frame rate of every captured video track.
pub const CAPTURE_FPS: Fps = Fps { num: 30, den: 1 };

const FRAME_EPS: f64 = 1e-6;

/// Samples the canvas into a constant-rate video track.
///
/// Capture is sample-and-hold: each call emits every output frame whose timestamp has been
/// reached, so a late tick repeats the current canvas and an early one emits nothing.
#[derive(Debug)]
pub struct CanvasCapture {
    fps: Fps,
    next: u64,
    total: u64,
}

impl CanvasCapture {
    /// Track of `len_secs` at `fps`.
    pub fn new(fps: Fps, len_secs: f64) -> Self {
        let total = (len_secs.max(0.0) * fps.as_f64()).round() as u64;
        Self {
            fps,
            next: 0,
            total,
        }
    }

    /// Frame rate of the track.
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Frames the finished track will contain.
    pub fn total_frames(&self) -> u64 {
        self.total
    }

    /// Frames emitted so far.
    pub fn frames_emitted(&self) -> u64 {
        self.next
    }

    /// Emit the frames due at `rel_secs` into the track. Returns how many were written.
    pub fn capture(
        &mut self,
        rel_secs: f64,
        canvas: &FrameRGBA,
        recorder: &mut dyn MediaRecorder,
    ) -> ClipResult<u64> {
        if !rel_secs.is_finite() || rel_secs < 0.0 {
            return Ok(0);
        }
        let due = (rel_secs * self.fps.as_f64() + FRAME_EPS).floor() as u64;
        self.emit_until((due + 1).min(self.total), canvas, recorder)
    }

    /// Hold the last canvas until the track reaches its full length.
    pub fn finish(
        &mut self,
        canvas: &FrameRGBA,
        recorder: &mut dyn MediaRecorder,
    ) -> ClipResult<u64> {
        self.emit_until(self.total, canvas, recorder)
    }

    fn emit_until(
        &mut self,
        end: u64,
        canvas: &FrameRGBA,
        recorder: &mut dyn MediaRecorder,
    ) -> ClipResult<u64> {
        let start = self.next;
        while self.next < end {
            recorder.push_frame(FrameIndex(self.next), canvas)?;
            self.next += 1;
        }
        Ok(self.next - start)
    }
}
