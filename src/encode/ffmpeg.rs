use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::audio::mix::write_mix_to_f32le_file;
use crate::compositor::frame::FrameRGBA;
use crate::encode::sink::{MediaRecorder, OUTPUT_MIME, RecordingOutput, StreamConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ClipError, ClipResult};
use crate::foundation::math::mul_div255_u16;

/// Options for [`FfmpegRecorder`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegRecorderOpts {
    /// Final MP4 path. Nothing exists here until the recording finished successfully.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl FfmpegRecorderOpts {
    /// Create options for outputting an MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Recorder that spawns the system `ffmpeg` and streams raw frames to stdin.
///
/// Video is H.264 (yuv420p) and audio AAC in an MP4 container. ffmpeg writes to a `.part` file
/// next to the output, which is renamed into place by `end` and deleted by `abort`.
pub struct FfmpegRecorder {
    opts: FfmpegRecorderOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    partial: TempFileGuard,
    audio_tmp: TempFileGuard,

    scratch: Vec<u8>,
    cfg: Option<StreamConfig>,
    last_idx: Option<FrameIndex>,
    frames: u64,
}

impl FfmpegRecorder {
    /// Create a recorder that streams into `ffmpeg`.
    pub fn new(opts: FfmpegRecorderOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            partial: TempFileGuard(None),
            audio_tmp: TempFileGuard(None),
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
            frames: 0,
        }
    }

    /// Where the finished file will be.
    pub fn out_path(&self) -> &Path {
        &self.opts.out_path
    }

    fn partial_path(&self) -> PathBuf {
        let mut name = self
            .opts
            .out_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "output.mp4".into());
        name.push(".part");
        self.opts.out_path.with_file_name(name)
    }

    fn finish_child(&mut self) -> ClipResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ClipError::evaluation("ffmpeg recorder not started"))?;

        let status = child.wait().map_err(|e| {
            ClipError::evaluation(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ClipError::evaluation("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| ClipError::evaluation(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(ClipError::evaluation(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl MediaRecorder for FfmpegRecorder {
    fn begin(&mut self, cfg: StreamConfig) -> ClipResult<()> {
        let (width, height) = (cfg.canvas.width, cfg.canvas.height);
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(ClipError::validation("fps must be non-zero"));
        }
        if width == 0 || height == 0 {
            return Err(ClipError::validation(
                "ffmpeg recorder width/height must be non-zero",
            ));
        }
        if !width.is_multiple_of(2) || !height.is_multiple_of(2) {
            return Err(ClipError::validation(
                "ffmpeg recorder width/height must be even (required for yuv420p mp4 output)",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(ClipError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(ClipError::evaluation(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let partial = self.partial_path();
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg("-y");

        // Input: raw RGBA8 frames, flattened from premultiplied in push_frame.
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{width}x{height}"),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0"]);

        if let Some(audio) = cfg.audio.as_ref() {
            if audio.sample_rate == 0 {
                return Err(ClipError::validation(
                    "audio sample_rate must be non-zero when audio is enabled",
                ));
            }
            if audio.channels == 0 {
                return Err(ClipError::validation(
                    "audio channels must be non-zero when audio is enabled",
                ));
            }
            let path = std::env::temp_dir().join(format!(
                "clipframe_audio_mix_{}_{}.f32le",
                std::process::id(),
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_nanos())
                    .unwrap_or(0)
            ));
            write_mix_to_f32le_file(&audio.interleaved_f32, &path)?;
            self.audio_tmp = TempFileGuard(Some(path.clone()));

            cmd.args([
                "-f",
                "f32le",
                "-ar",
                &audio.sample_rate.to_string(),
                "-ac",
                &audio.channels.to_string(),
                "-i",
            ])
            .arg(&path)
            .args([
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "aac",
                "-shortest",
                "-movflags",
                "+faststart",
            ]);
        } else {
            cmd.args([
                "-an",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ]);
        }
        cmd.args(["-f", "mp4"]).arg(&partial);

        let mut child = cmd.spawn().map_err(|e| {
            ClipError::evaluation(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        self.partial = TempFileGuard(Some(partial));

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClipError::evaluation("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ClipError::evaluation("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::info!(
            out = %self.opts.out_path.display(),
            width,
            height,
            fps = cfg.fps.as_f64(),
            audio = cfg.audio.is_some(),
            "ffmpeg recorder started"
        );

        self.scratch = vec![0u8; width as usize * height as usize * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.frames = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ClipResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ClipError::evaluation("ffmpeg recorder not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(ClipError::evaluation(
                "ffmpeg recorder received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.canvas() != cfg.canvas {
            return Err(ClipError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.canvas.width, cfg.canvas.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(ClipError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ClipError::evaluation("ffmpeg recorder is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            ClipError::evaluation(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.frames += 1;
        Ok(())
    }

    fn end(&mut self) -> ClipResult<RecordingOutput> {
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| ClipError::evaluation("ffmpeg recorder not started"))?;
        if let Err(e) = self.finish_child() {
            self.abort();
            return Err(e);
        }
        drop(std::mem::replace(&mut self.audio_tmp, TempFileGuard(None)));

        let partial = self
            .partial
            .0
            .take()
            .ok_or_else(|| ClipError::evaluation("ffmpeg recorder lost its partial output"))?;
        if let Err(e) = std::fs::rename(&partial, &self.opts.out_path) {
            let _ = std::fs::remove_file(&partial);
            return Err(ClipError::evaluation(format!(
                "failed to move '{}' into place: {e}",
                self.opts.out_path.display()
            )));
        }

        tracing::info!(
            out = %self.opts.out_path.display(),
            frames = self.frames,
            "ffmpeg recorder finished"
        );
        Ok(RecordingOutput {
            path: Some(self.opts.out_path.clone()),
            mime: OUTPUT_MIME,
            canvas: cfg.canvas,
            frames: self.frames,
            duration_secs: cfg.fps.frames_to_secs(self.frames),
            has_audio: cfg.audio.is_some(),
        })
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
        self.partial = TempFileGuard(None);
        self.audio_tmp = TempFileGuard(None);
        self.cfg = None;
        tracing::debug!(out = %self.opts.out_path.display(), "ffmpeg recorder aborted");
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

/// Removes the file it points at when dropped.
struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // rawvideo input takes its rate from `-r` placed before `-i`.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> ClipResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(ClipError::validation(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = u16::from(bg_rgba[0]);
    let bg_g = u16::from(bg_rgba[1]);
    let bg_b = u16::from(bg_rgba[2]);

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        d[0] = (u16::from(s[0]) + mul_div255_u16(bg_r, inv)).min(255) as u8;
        d[1] = (u16::from(s[1]) + mul_div255_u16(bg_g, inv)).min(255) as u8;
        d[2] = (u16::from(s[2]) + mul_div255_u16(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ClipResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
