use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::assets::color::ColorDef;
use crate::assets::decode::RasterImage;
use crate::assets::text::FontAsset;
use crate::foundation::core::{AspectRatio, ExportQuality};
use crate::foundation::error::{ClipError, ClipResult};

/// Smallest zoom the editor offers.
pub const MIN_ZOOM: f64 = 0.5;
/// Largest zoom the editor offers.
pub const MAX_ZOOM: f64 = 3.0;

/// Complete editing state for one clip.
///
/// Sessions are values: every edit produces a new session (see the `with_*` methods) and the
/// compositor and capture driver only ever read a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditSession {
    /// Source video path.
    pub video: Option<PathBuf>,
    /// Target aspect ratio.
    pub aspect: AspectRatio,
    /// Zoom framing.
    pub crop: CropSpec,
    /// Export resolution tier.
    pub quality: ExportQuality,
    /// Optional watermark layer.
    pub watermark: Option<WatermarkSpec>,
    /// Background beneath the video layer.
    pub background: BackgroundSpec,
    /// Trim range; `None` selects the whole clip.
    pub trim: Option<TrimRange>,
    /// Audio gains and optional music.
    pub audio: AudioMixSpec,
}

impl EditSession {
    /// Parse a session from JSON.
    pub fn from_json_str(json: &str) -> ClipResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ClipError::validation(format!("invalid session json: {e}")))
    }

    /// Read a session JSON file. Relative asset paths are resolved against the file's directory.
    pub fn from_json_file(path: &Path) -> ClipResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read session '{}'", path.display()))?;
        let session = Self::from_json_str(&text)?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(session.resolve_paths(root))
    }

    /// Make relative asset paths relative to `root`.
    pub fn resolve_paths(mut self, root: &Path) -> Self {
        fn fix(p: &mut PathBuf, root: &Path) {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        }
        if let Some(v) = self.video.as_mut() {
            fix(v, root);
        }
        if let Some(WatermarkSpec {
            content: WatermarkContent::Image { source, .. },
            ..
        }) = self.watermark.as_mut()
        {
            fix(source, root);
        }
        if let BackgroundSpec::Image { source, .. } = &mut self.background {
            fix(source, root);
        }
        if let Some(music) = self.audio.music.as_mut() {
            fix(&mut music.source, root);
        }
        self
    }

    /// Check that every numeric setting is finite and in range.
    pub fn validate(&self) -> ClipResult<()> {
        fn unit(name: &str, v: f64) -> ClipResult<()> {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(ClipError::validation(format!("{name} must be within [0, 1]")));
            }
            Ok(())
        }
        fn non_negative(name: &str, v: f64) -> ClipResult<()> {
            if !v.is_finite() || v < 0.0 {
                return Err(ClipError::validation(format!("{name} must be >= 0")));
            }
            Ok(())
        }

        if !self.crop.zoom.is_finite() || self.crop.zoom <= 0.0 {
            return Err(ClipError::validation("zoom must be finite and > 0"));
        }
        if let Some(wm) = &self.watermark {
            unit("watermark opacity", wm.opacity)?;
            non_negative("watermark blur", wm.blur_px)?;
            if !wm.rotation_deg.is_finite() {
                return Err(ClipError::validation("watermark rotation must be finite"));
            }
            if let WatermarkContent::Image { size_percent, .. } = wm.content
                && (!size_percent.is_finite() || size_percent <= 0.0)
            {
                return Err(ClipError::validation("watermark size percent must be > 0"));
            }
        }
        if let BackgroundSpec::Image { blur_px, .. } = self.background {
            non_negative("background blur", blur_px)?;
        }
        unit("video volume", self.audio.video_volume)?;
        if let Some(music) = &self.audio.music {
            unit("music volume", music.volume)?;
        }
        if let Some(trim) = self.trim
            && (!trim.start.is_finite() || !trim.end.is_finite())
        {
            return Err(ClipError::validation("trim bounds must be finite"));
        }
        Ok(())
    }

    /// Effective trim range for a source of `duration` seconds.
    pub fn resolved_trim(&self, duration: f64) -> TrimRange {
        self.trim
            .unwrap_or(TrimRange {
                start: 0.0,
                end: duration,
            })
            .clamped(duration)
    }

    /// Replace the source video (trim resets to the whole clip).
    pub fn with_video(mut self, video: impl Into<PathBuf>) -> Self {
        self.video = Some(video.into());
        self.trim = None;
        self
    }

    /// Replace the aspect ratio.
    pub fn with_aspect(mut self, aspect: AspectRatio) -> Self {
        self.aspect = aspect;
        self
    }

    /// Replace the zoom factor.
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.crop = CropSpec { zoom };
        self
    }

    /// Replace the export tier.
    pub fn with_quality(mut self, quality: ExportQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Replace (or remove) the watermark.
    pub fn with_watermark(mut self, watermark: Option<WatermarkSpec>) -> Self {
        self.watermark = watermark;
        self
    }

    /// Replace the background.
    pub fn with_background(mut self, background: BackgroundSpec) -> Self {
        self.background = background;
        self
    }

    /// Replace the trim range.
    pub fn with_trim(mut self, start: f64, end: f64) -> Self {
        self.trim = Some(TrimRange { start, end });
        self
    }

    /// Replace the audio mix.
    pub fn with_audio(mut self, audio: AudioMixSpec) -> Self {
        self.audio = audio;
        self
    }
}

/// Zoom framing of the video layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropSpec {
    /// `>= 1` zooms into the source, `< 1` shrinks the drawn frame.
    pub zoom: f64,
}

impl Default for CropSpec {
    fn default() -> Self {
        Self { zoom: 1.0 }
    }
}

impl CropSpec {
    /// Zoom clamped to the offered range.
    pub fn effective_zoom(self) -> f64 {
        if self.zoom.is_finite() {
            self.zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            1.0
        }
    }
}

/// Named watermark placement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    /// Top-left corner.
    TopLeft,
    /// Top-right corner.
    TopRight,
    /// Bottom-left corner.
    BottomLeft,
    /// Bottom-right corner.
    #[default]
    BottomRight,
    /// Centered on both axes (margin ignored).
    Center,
}

impl Anchor {
    /// All five anchors.
    pub const ALL: [Anchor; 5] = [
        Anchor::TopLeft,
        Anchor::TopRight,
        Anchor::BottomLeft,
        Anchor::BottomRight,
        Anchor::Center,
    ];
}

/// What the watermark draws.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WatermarkContent {
    /// A single line of text.
    Text {
        /// Text to draw; blank text draws nothing.
        content: String,
        /// Fill color.
        #[serde(default = "ColorDef::white")]
        color: ColorDef,
    },
    /// An image asset.
    Image {
        /// Image file.
        source: PathBuf,
        /// Drawn width as a percentage of canvas width.
        #[serde(default = "default_image_size_percent")]
        size_percent: f64,
    },
}

pub(crate) fn default_image_size_percent() -> f64 {
    20.0
}

/// Watermark layer settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatermarkSpec {
    /// Text or image.
    #[serde(flatten)]
    pub content: WatermarkContent,
    /// Placement.
    #[serde(default)]
    pub anchor: Anchor,
    /// Uniform alpha in `[0, 1]`.
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Rotation around the box center in degrees, clockwise positive.
    #[serde(default)]
    pub rotation_deg: f64,
    /// Gaussian blur standard deviation in pixels.
    #[serde(default)]
    pub blur_px: f64,
}

fn default_opacity() -> f64 {
    1.0
}

impl WatermarkSpec {
    /// Text watermark with default attributes.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: WatermarkContent::Text {
                content: content.into(),
                color: ColorDef::white(),
            },
            anchor: Anchor::default(),
            opacity: default_opacity(),
            rotation_deg: 0.0,
            blur_px: 0.0,
        }
    }

    /// Image watermark with default attributes.
    pub fn image(source: impl Into<PathBuf>, size_percent: f64) -> Self {
        Self {
            content: WatermarkContent::Image {
                source: source.into(),
                size_percent,
            },
            anchor: Anchor::default(),
            opacity: default_opacity(),
            rotation_deg: 0.0,
            blur_px: 0.0,
        }
    }

    /// Replace the anchor.
    pub fn at(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Replace the opacity.
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    /// Replace the rotation.
    pub fn with_rotation(mut self, rotation_deg: f64) -> Self {
        self.rotation_deg = rotation_deg;
        self
    }

    /// Replace the blur radius.
    pub fn with_blur(mut self, blur_px: f64) -> Self {
        self.blur_px = blur_px;
        self
    }
}

/// Full-canvas layer beneath the video.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackgroundSpec {
    /// Flat color fill.
    Color {
        /// Fill color.
        value: ColorDef,
    },
    /// Cover-fit image, optionally blurred.
    Image {
        /// Image file.
        source: PathBuf,
        /// Gaussian blur standard deviation in pixels.
        #[serde(default)]
        blur_px: f64,
    },
}

impl Default for BackgroundSpec {
    fn default() -> Self {
        Self::Color {
            value: ColorDef::black(),
        }
    }
}

/// Selected time window of the source, in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrimRange {
    /// Inclusive start.
    pub start: f64,
    /// End; must be greater than `start`.
    pub end: f64,
}

impl TrimRange {
    /// Both bounds clamped to `[0, duration]`.
    pub fn clamped(self, duration: f64) -> Self {
        let max = if duration.is_finite() {
            duration.max(0.0)
        } else {
            f64::MAX
        };
        Self {
            start: self.start.clamp(0.0, max),
            end: self.end.clamp(0.0, max),
        }
    }

    /// Reject empty or inverted ranges.
    pub fn validate(self) -> ClipResult<()> {
        if !(self.end > self.start) {
            return Err(ClipError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// `end - start`.
    pub fn len_secs(self) -> f64 {
        self.end - self.start
    }

    /// Fraction of the range covered at `position`, clamped to `[0, 1]`.
    pub fn progress_at(self, position: f64) -> f64 {
        let len = self.len_secs();
        if len <= 0.0 {
            return 0.0;
        }
        ((position - self.start) / len).clamp(0.0, 1.0)
    }
}

/// Gains of the two audio sources.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioMixSpec {
    /// Gain applied to the source video's audio.
    pub video_volume: f64,
    /// Optional background music.
    pub music: Option<MusicSpec>,
}

impl Default for AudioMixSpec {
    fn default() -> Self {
        Self {
            video_volume: 1.0,
            music: None,
        }
    }
}

/// Background music track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MusicSpec {
    /// Audio file.
    pub source: PathBuf,
    /// Gain in `[0, 1]`.
    #[serde(default = "default_music_volume")]
    pub volume: f64,
}

fn default_music_volume() -> f64 {
    0.5
}

/// Decoded assets owned by the session.
///
/// A `None` image means "not loaded (yet)"; the compositor skips the layer.
#[derive(Clone, Debug, Default)]
pub struct LoadedAssets {
    /// Decoded watermark image.
    pub watermark_image: Option<RasterImage>,
    /// Decoded background image.
    pub background_image: Option<RasterImage>,
    /// Font for text watermarks.
    pub font: Option<FontAsset>,
}

#[cfg(test)]
#[path = "../../tests/unit/session/model.rs"]
mod tests;
