use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::assets::decode::RasterImage;
use crate::foundation::error::{ClipError, ClipResult};

/// Sample rate used for every decoded and mixed audio track.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Probed properties of the loaded source video.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceMedia {
    /// Path of the decodable asset.
    pub path: PathBuf,
    /// Natural frame width in pixels.
    pub width: u32,
    /// Natural frame height in pixels.
    pub height: u32,
    /// Source frame rate numerator.
    pub fps_num: u32,
    /// Source frame rate denominator.
    pub fps_den: u32,
    /// Duration in seconds.
    pub duration_sec: f64,
    /// Whether the container carries at least one audio stream.
    pub has_audio: bool,
}

impl SourceMedia {
    /// Source frame rate as a float, `0.0` when unknown.
    pub fn source_fps(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }
}

/// Interleaved `f32` PCM.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count (1 or 2).
    pub channels: u16,
    /// Interleaved samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.interleaved_f32.len() / usize::from(self.channels)
        }
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / f64::from(self.sample_rate)
        }
    }
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
    tags: Option<ProbeTags>,
    side_data_list: Option<Vec<ProbeSideData>>,
}

#[derive(serde::Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

impl ProbeStream {
    /// Display rotation in degrees, normalized to `[0, 360)`.
    fn rotation_deg(&self) -> i64 {
        let side = self
            .side_data_list
            .iter()
            .flatten()
            .find_map(|d| d.rotation);
        let tag = self
            .tags
            .as_ref()
            .and_then(|t| t.rotate.as_deref())
            .and_then(|r| r.trim().parse::<f64>().ok());
        side.or(tag)
            .filter(|r| r.is_finite())
            .map_or(0, |r| (r.round() as i64).rem_euclid(360))
    }
}

fn parse_duration(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Probe a video file with `ffprobe`.
pub fn probe_video(source_path: &Path) -> ClipResult<SourceMedia> {
    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| ClipError::evaluation(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ClipError::invalid_input(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    parse_probe_output(source_path, &out.stdout)
}

/// Build [`SourceMedia`] from `ffprobe -print_format json -show_streams -show_format` output.
///
/// Width and height are the displayed size: a ±90° rotation swaps the coded dimensions, matching
/// the frames `ffmpeg` emits after autorotation.
pub(crate) fn parse_probe_output(source_path: &Path, json: &[u8]) -> ClipResult<SourceMedia> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| ClipError::evaluation(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ClipError::invalid_input("no video stream found"))?;
    let coded_width = video_stream
        .width
        .ok_or_else(|| ClipError::evaluation("missing video width from ffprobe"))?;
    let coded_height = video_stream
        .height
        .ok_or_else(|| ClipError::evaluation("missing video height from ffprobe"))?;
    let rotation = video_stream.rotation_deg();
    let (width, height) = if rotation == 90 || rotation == 270 {
        (coded_height, coded_width)
    } else {
        (coded_width, coded_height)
    };

    let (fps_num, fps_den) = parse_ff_ratio(video_stream.r_frame_rate.as_deref().unwrap_or("0/1"))
        .ok_or_else(|| ClipError::evaluation("invalid video r_frame_rate"))?;
    let duration_sec = parse_duration(parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
        .or_else(|| parse_duration(video_stream.duration.as_deref()))
        .ok_or_else(|| {
            ClipError::invalid_input(format!(
                "'{}' has no known duration",
                source_path.display()
            ))
        })?;
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    tracing::debug!(
        path = %source_path.display(),
        width,
        height,
        rotation,
        duration_sec,
        has_audio,
        "probed source video"
    );

    Ok(SourceMedia {
        path: source_path.to_path_buf(),
        width,
        height,
        fps_num,
        fps_den,
        duration_sec,
        has_audio,
    })
}

/// Decode the audio of `path` to interleaved stereo `f32` PCM.
///
/// `window` limits decoding to `(start_sec, duration_sec)`. Files without an audio stream yield
/// empty PCM.
pub fn decode_audio_f32_stereo(
    path: &Path,
    sample_rate: u32,
    window: Option<(f64, f64)>,
) -> ClipResult<AudioPcm> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-v", "error"]);
    if let Some((start, _)) = window {
        cmd.args(["-ss", &format!("{:.6}", start.max(0.0))]);
    }
    cmd.arg("-i").arg(path);
    if let Some((_, duration)) = window {
        cmd.args(["-t", &format!("{:.6}", duration.max(0.0))]);
    }
    let out = cmd
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| ClipError::evaluation(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        // ffmpeg reports a missing audio stream as an error.
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("does not contain any stream")
        {
            return Ok(AudioPcm {
                sample_rate,
                channels: 2,
                interleaved_f32: Vec::new(),
            });
        }
        return Err(ClipError::asset_load(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(ClipError::evaluation(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let mut pcm = Vec::<f32>::with_capacity(out.stdout.len() / 4);
    for chunk in out.stdout.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32: pcm,
    })
}

/// Sequential RGBA frame reader over one `ffmpeg` rawvideo pipe.
///
/// Frames are read forward only; seeking restarts the pipe at the new position.
pub struct FfmpegFrameReader {
    source: SourceMedia,
    child: Child,
    stdout: ChildStdout,
    start_sec: f64,
    frame_bytes: usize,
    frames_read: u64,
    current: Option<RasterImage>,
    exhausted: bool,
}

impl FfmpegFrameReader {
    /// Spawn a decoder starting at `start_sec`.
    pub fn open(source: &SourceMedia, start_sec: f64) -> ClipResult<Self> {
        let frame_bytes = (source.width as usize) * (source.height as usize) * 4;
        if frame_bytes == 0 {
            return Err(ClipError::evaluation(
                "decoded video frame size is zero (invalid source dimensions)",
            ));
        }
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{:.6}", start_sec.max(0.0))])
            .arg("-i")
            .arg(&source.path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                ClipError::evaluation(format!("failed to spawn ffmpeg for video decode: {e}"))
            })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClipError::evaluation("failed to open ffmpeg stdout (unexpected)"))?;
        Ok(Self {
            source: source.clone(),
            child,
            stdout,
            start_sec: start_sec.max(0.0),
            frame_bytes,
            frames_read: 0,
            current: None,
            exhausted: false,
        })
    }

    /// Position the reader was opened at.
    pub fn start_sec(&self) -> f64 {
        self.start_sec
    }

    /// Return the latest frame whose timestamp is `<= at_sec`.
    ///
    /// Returns `None` only when no frame at all could be decoded.
    pub fn frame_at(&mut self, at_sec: f64) -> ClipResult<Option<RasterImage>> {
        let fps = self.source.source_fps();
        let frame_dur = if fps > 0.0 { 1.0 / fps } else { 1.0 / 30.0 };
        loop {
            if self.exhausted {
                break;
            }
            let next_ts = self.start_sec + (self.frames_read as f64) * frame_dur;
            if self.current.is_some() && next_ts > at_sec + 1e-9 {
                break;
            }
            match self.read_one()? {
                Some(frame) => {
                    self.current = Some(frame);
                    self.frames_read += 1;
                }
                None => self.exhausted = true,
            }
        }
        Ok(self.current.clone())
    }

    fn read_one(&mut self) -> ClipResult<Option<RasterImage>> {
        let mut buf = vec![0u8; self.frame_bytes];
        let mut filled = 0usize;
        while filled < buf.len() {
            let n = self.stdout.read(&mut buf[filled..]).map_err(|e| {
                ClipError::evaluation(format!("failed to read decoded frame from ffmpeg: {e}"))
            })?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled < buf.len() {
            return Ok(None);
        }
        RasterImage::from_straight(self.source.width, self.source.height, buf).map(Some)
    }
}

impl Drop for FfmpegFrameReader {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}
