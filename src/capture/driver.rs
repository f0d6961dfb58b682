use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::assets::media::MIX_SAMPLE_RATE;
use crate::audio::mix::AudioMixGraph;
use crate::capture::canvas_capture::{CAPTURE_FPS, CanvasCapture};
use crate::capture::player::{AudioLoader, MediaPlayer};
use crate::capture::ticks::{TickFlow, TickSource, run_ticks};
use crate::compositor::cpu::Compositor;
use crate::compositor::frame::FrameRGBA;
use crate::encode::sink::{MediaRecorder, RecordingOutput, StreamConfig};
use crate::foundation::core::{AspectRatio, Canvas};
use crate::foundation::error::{ClipError, ClipResult};
use crate::session::model::{EditSession, LoadedAssets, TrimRange};

/// Lifecycle of one export job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CaptureState {
    /// No job running.
    #[default]
    Idle,
    /// Building the audio graph and binding the recorder.
    Priming,
    /// Per-tick composite and capture.
    Rendering,
    /// Flushing the recorder.
    Finalizing,
    /// Output available.
    Done,
    /// Job ended with an error; partial output was discarded.
    Failed,
    /// Job was cancelled; partial output was discarded.
    Cancelled,
}

impl CaptureState {
    /// `true` for `Done`, `Failed` and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

/// Shared flag asking a running export to stop.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; observed on the next tick.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Observable status of the current (or last) export.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderJob {
    state: CaptureState,
    progress: f64,
    frames_captured: u64,
    output: Option<RecordingOutput>,
}

impl RenderJob {
    /// Current state.
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Progress in `[0, 1]`; never decreases within a job.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Frames handed to the recorder so far.
    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }

    /// Recorder output, once the job is `Done`.
    pub fn output(&self) -> Option<&RecordingOutput> {
        self.output.as_ref()
    }
}

/// External collaborators of one export.
pub struct CapturePorts<'a> {
    /// Source playback.
    pub player: &'a mut dyn MediaPlayer,
    /// Music decoder.
    pub audio_loader: &'a dyn AudioLoader,
    /// Encoder.
    pub recorder: &'a mut dyn MediaRecorder,
    /// Frame scheduler.
    pub ticks: &'a mut dyn TickSource,
}

type ProgressFn = Box<dyn FnMut(f64) + Send>;

/// Drives the source through the compositor into a recorder for the trim window.
///
/// One job at a time: [`CaptureDriver::export`] runs `Idle -> Priming -> Rendering ->
/// Finalizing -> Done` on the caller's thread, or ends in `Failed`/`Cancelled` with the recorder
/// aborted, monitor volume restored and the audio graph released.
pub struct CaptureDriver {
    compositor: Compositor,
    canvas: FrameRGBA,
    job: RenderJob,
    cancel: CancelToken,
    on_progress: Option<ProgressFn>,
}

impl Default for CaptureDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDriver {
    /// Idle driver with a preview-sized canvas.
    pub fn new() -> Self {
        Self {
            compositor: Compositor::new(),
            canvas: FrameRGBA::new(Canvas::for_preview(AspectRatio::default())),
            job: RenderJob::default(),
            cancel: CancelToken::new(),
            on_progress: None,
        }
    }

    /// Call `f` whenever progress moves forward.
    pub fn with_progress(mut self, f: impl FnMut(f64) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Token cancelling the running (or next) job.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Status of the current or last job.
    pub fn job(&self) -> &RenderJob {
        &self.job
    }

    /// Forget the last job's status; a pending cancel request is dropped too.
    pub fn reset_job(&mut self) {
        self.job = RenderJob::default();
        self.cancel.clear();
    }

    /// The capture canvas.
    pub fn canvas(&self) -> &FrameRGBA {
        &self.canvas
    }

    /// Export the trim window of `session`.
    ///
    /// The session is snapshotted here; edits made while the job runs do not affect it. An
    /// inverted trim fails with [`ClipError::InvalidRange`] before anything is touched.
    #[tracing::instrument(skip_all, fields(aspect = ?session.aspect, quality = ?session.quality))]
    pub fn export(
        &mut self,
        session: &EditSession,
        assets: &LoadedAssets,
        ports: CapturePorts<'_>,
    ) -> ClipResult<RecordingOutput> {
        self.job = RenderJob::default();
        let snapshot = session.clone();
        snapshot.validate()?;
        let trim = snapshot.resolved_trim(ports.player.info().duration_sec);
        trim.validate()?;

        let CapturePorts {
            player,
            audio_loader,
            recorder,
            ticks,
        } = ports;

        let saved_volume = player.volume();
        let saved_muted = player.muted();
        let mut graph = None;

        let result = self.run_job(
            &snapshot,
            assets,
            trim,
            &mut graph,
            player,
            audio_loader,
            recorder,
            ticks,
        );

        player.pause();
        player.set_volume(saved_volume);
        player.set_muted(saved_muted);
        self.cancel.clear();

        match result {
            Ok(output) => {
                if let Some(graph) = graph.take() {
                    graph.release();
                }
                self.advance_progress(1.0);
                self.job.output = Some(output.clone());
                self.job.state = CaptureState::Done;
                tracing::info!(
                    frames = output.frames,
                    duration_secs = output.duration_secs,
                    "export done"
                );
                Ok(output)
            }
            Err(err) => {
                recorder.abort();
                if let Some(graph) = graph.take() {
                    graph.release();
                }
                self.job.state = if matches!(err, ClipError::Cancelled) {
                    CaptureState::Cancelled
                } else {
                    CaptureState::Failed
                };
                tracing::warn!(
                    state = ?self.job.state,
                    error = %err,
                    "export ended without output"
                );
                Err(err)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_job(
        &mut self,
        session: &EditSession,
        assets: &LoadedAssets,
        trim: TrimRange,
        graph_slot: &mut Option<AudioMixGraph>,
        player: &mut dyn MediaPlayer,
        audio_loader: &dyn AudioLoader,
        recorder: &mut dyn MediaRecorder,
        ticks: &mut dyn TickSource,
    ) -> ClipResult<RecordingOutput> {
        self.job.state = CaptureState::Priming;
        let canvas = Canvas::for_export(session.aspect, session.quality);
        self.canvas.resize(canvas);

        let graph = graph_slot.insert(AudioMixGraph::open(MIX_SAMPLE_RATE)?);
        if let Some(pcm) = player.source_audio(trim)? {
            graph.connect("video", pcm, session.audio.video_volume)?;
        }
        if let Some(music) = &session.audio.music {
            let pcm = audio_loader.load(&music.source)?;
            graph.connect("music", pcm, music.volume)?;
        }
        let mixed = graph.mixdown(trim.len_secs());

        let mut capture = CanvasCapture::new(CAPTURE_FPS, trim.len_secs());
        recorder.begin(StreamConfig {
            canvas,
            fps: capture.fps(),
            audio: Some(mixed),
        })?;
        tracing::debug!(
            width = canvas.width,
            height = canvas.height,
            start = trim.start,
            end = trim.end,
            "capture primed"
        );

        player.seek(trim.start)?;
        player.set_volume(0.0);
        player.play()?;
        self.job.state = CaptureState::Rendering;

        run_ticks(ticks, |_tick| {
            if self.cancel.is_cancelled() {
                return Err(ClipError::Cancelled);
            }
            let pos = player.position();
            if pos >= trim.end || !player.is_playing() {
                return Ok(TickFlow::Stop);
            }
            self.advance_progress(trim.progress_at(pos));
            let frame = player.current_frame()?;
            self.compositor
                .composite(&mut self.canvas, frame.as_ref(), session, assets)?;
            self.job.frames_captured +=
                capture.capture(pos - trim.start, &self.canvas, recorder)?;
            Ok(TickFlow::Continue)
        })?;

        self.job.state = CaptureState::Finalizing;
        self.job.frames_captured += capture.finish(&self.canvas, recorder)?;
        recorder.end()
    }

    fn advance_progress(&mut self, p: f64) {
        if p > self.job.progress {
            self.job.progress = p;
            if let Some(f) = self.on_progress.as_mut() {
                f(p);
            }
        }
    }
}
