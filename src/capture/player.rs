use std::path::Path;
use std::time::Duration;

use crate::assets::decode::RasterImage;
use crate::assets::media::{
    AudioPcm, FfmpegFrameReader, MIX_SAMPLE_RATE, SourceMedia, decode_audio_f32_stereo,
    probe_video,
};
use crate::capture::clock::MediaClock;
use crate::foundation::error::{ClipError, ClipResult};
use crate::session::model::TrimRange;

/// Playback engine the capture driver talks to.
///
/// Positions are in source seconds. `volume` and `muted` only affect the monitor output; the
/// driver reads source audio through [`MediaPlayer::source_audio`] regardless of either.
pub trait MediaPlayer {
    /// Probed source properties.
    fn info(&self) -> &SourceMedia;
    /// Current playback position.
    fn position(&self) -> f64;
    /// Jump to `secs` (clamped to the source).
    fn seek(&mut self, secs: f64) -> ClipResult<()>;
    /// Start playback. Fails with [`ClipError::PlaybackStart`] when the engine refuses.
    fn play(&mut self) -> ClipResult<()>;
    /// Stop advancing the position.
    fn pause(&mut self);
    /// `false` once paused or once the end of the source is reached.
    fn is_playing(&self) -> bool;
    /// Monitor volume in `[0, 1]`.
    fn volume(&self) -> f64;
    /// Set the monitor volume.
    fn set_volume(&mut self, volume: f64);
    /// Monitor mute flag.
    fn muted(&self) -> bool;
    /// Set the monitor mute flag.
    fn set_muted(&mut self, muted: bool);
    /// Frame visible at the current position, `None` when nothing decodable is there.
    fn current_frame(&mut self) -> ClipResult<Option<RasterImage>>;
    /// Source audio for `range`, `None` when the source has no audio stream.
    fn source_audio(&mut self, range: TrimRange) -> ClipResult<Option<AudioPcm>>;
}

/// Fully decodes a music file.
pub trait AudioLoader {
    /// Decode `path` to PCM; failures are [`ClipError::AssetLoad`].
    fn load(&self, path: &Path) -> ClipResult<AudioPcm>;
}

/// [`AudioLoader`] backed by the system `ffmpeg`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegAudioLoader;

impl AudioLoader for FfmpegAudioLoader {
    fn load(&self, path: &Path) -> ClipResult<AudioPcm> {
        if !path.is_file() {
            return Err(ClipError::asset_load(format!(
                "music file '{}' does not exist",
                path.display()
            )));
        }
        decode_audio_f32_stereo(path, MIX_SAMPLE_RATE, None).map_err(|e| match e {
            ClipError::AssetLoad(_) => e,
            other => ClipError::asset_load(other.to_string()),
        })
    }
}

/// Decoders further ahead than this restart at the target instead of reading forward.
const FORWARD_SEEK_REOPEN_SECS: f64 = 2.0;

/// [`MediaPlayer`] decoding through `ffmpeg` with its position driven by a [`MediaClock`].
pub struct FfmpegPlayer {
    info: SourceMedia,
    clock: Box<dyn MediaClock>,
    anchor_pos: f64,
    anchor_clock: Duration,
    playing: bool,
    volume: f64,
    muted: bool,
    reader: Option<FfmpegFrameReader>,
    last_frame_pos: f64,
}

impl FfmpegPlayer {
    /// Probe `path` and build a paused player at position 0.
    pub fn open(path: &Path, clock: Box<dyn MediaClock>) -> ClipResult<Self> {
        let info = probe_video(path)?;
        Ok(Self::from_media(info, clock))
    }

    /// Player over already probed media.
    pub fn from_media(info: SourceMedia, clock: Box<dyn MediaClock>) -> Self {
        let anchor_clock = clock.now();
        Self {
            info,
            clock,
            anchor_pos: 0.0,
            anchor_clock,
            playing: false,
            volume: 1.0,
            muted: false,
            reader: None,
            last_frame_pos: 0.0,
        }
    }

    fn raw_position(&self) -> f64 {
        if !self.playing {
            return self.anchor_pos;
        }
        let dt = self.clock.now().saturating_sub(self.anchor_clock);
        self.anchor_pos + dt.as_secs_f64()
    }

    fn reanchor(&mut self, pos: f64) {
        self.anchor_pos = pos;
        self.anchor_clock = self.clock.now();
    }
}

impl MediaPlayer for FfmpegPlayer {
    fn info(&self) -> &SourceMedia {
        &self.info
    }

    fn position(&self) -> f64 {
        self.raw_position().min(self.info.duration_sec)
    }

    fn seek(&mut self, secs: f64) -> ClipResult<()> {
        if !secs.is_finite() {
            return Err(ClipError::validation("seek position must be finite"));
        }
        let target = secs.clamp(0.0, self.info.duration_sec);
        self.reanchor(target);
        let stale = self.reader.as_ref().is_some_and(|r| {
            target + 1e-9 < r.start_sec().max(self.last_frame_pos)
                || target > self.last_frame_pos + FORWARD_SEEK_REOPEN_SECS
        });
        if stale {
            self.reader = None;
        }
        Ok(())
    }

    fn play(&mut self) -> ClipResult<()> {
        if self.info.width == 0 || self.info.height == 0 {
            return Err(ClipError::playback_start(format!(
                "'{}' has no decodable video stream",
                self.info.path.display()
            )));
        }
        if self.position() >= self.info.duration_sec {
            return Err(ClipError::playback_start(
                "cannot start playback at the end of the source",
            ));
        }
        if !self.playing {
            let pos = self.anchor_pos;
            self.reanchor(pos);
            self.playing = true;
            tracing::debug!(position = pos, "playback started");
        }
        Ok(())
    }

    fn pause(&mut self) {
        if self.playing {
            let pos = self.position();
            self.playing = false;
            self.reanchor(pos);
        }
    }

    fn is_playing(&self) -> bool {
        self.playing && self.raw_position() < self.info.duration_sec
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn current_frame(&mut self) -> ClipResult<Option<RasterImage>> {
        let pos = self.position();
        if pos + 1e-9 < self.last_frame_pos {
            self.reader = None;
        }
        if self.reader.is_none() {
            self.reader = Some(FfmpegFrameReader::open(&self.info, pos)?);
        }
        self.last_frame_pos = pos;
        match self.reader.as_mut() {
            Some(reader) => reader.frame_at(pos),
            None => Ok(None),
        }
    }

    fn source_audio(&mut self, range: TrimRange) -> ClipResult<Option<AudioPcm>> {
        if !self.info.has_audio {
            return Ok(None);
        }
        let pcm = decode_audio_f32_stereo(
            &self.info.path,
            MIX_SAMPLE_RATE,
            Some((range.start, range.len_secs())),
        )?;
        Ok(Some(pcm))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/player.rs"]
mod tests;
