use crate::foundation::error::{ClipError, ClipResult};

pub use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Canvas height of the interactive preview pass.
pub const PREVIEW_HEIGHT: u32 = 853;

/// 0-based index of a captured output frame.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> ClipResult<Self> {
        if den == 0 {
            return Err(ClipError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(ClipError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Convert frame count to seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }

    /// Convert seconds to frame count using floor semantics.
    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        (secs * self.as_f64()).floor().max(0.0) as u64
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Canvas of fixed `height` whose width follows `aspect`.
    pub fn for_aspect(aspect: AspectRatio, height: u32) -> Self {
        let width = (f64::from(height) * aspect.ratio()).round().max(1.0) as u32;
        Self { width, height }
    }

    /// Export canvas for `aspect` at `quality`.
    ///
    /// yuv420p needs even dimensions, so the derived width is rounded up to even.
    pub fn for_export(aspect: AspectRatio, quality: ExportQuality) -> Self {
        let mut canvas = Self::for_aspect(aspect, quality.height());
        if !canvas.width.is_multiple_of(2) {
            canvas.width += 1;
        }
        canvas
    }

    /// Canvas used by the interactive preview.
    pub fn for_preview(aspect: AspectRatio) -> Self {
        Self::for_aspect(aspect, PREVIEW_HEIGHT)
    }

    /// Canvas size in floating point.
    pub fn size(self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

/// One of the three target aspect ratios offered by the editor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AspectRatio {
    /// Vertical 9:16 (shorts, reels).
    #[default]
    #[serde(rename = "9:16")]
    Portrait9x16,
    /// Square 1:1.
    #[serde(rename = "1:1")]
    Square1x1,
    /// Horizontal 16:9.
    #[serde(rename = "16:9")]
    Landscape16x9,
}

impl AspectRatio {
    /// Width divided by height.
    pub fn ratio(self) -> f64 {
        match self {
            Self::Portrait9x16 => 9.0 / 16.0,
            Self::Square1x1 => 1.0,
            Self::Landscape16x9 => 16.0 / 9.0,
        }
    }
}

/// Export resolution tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportQuality {
    /// 1920 px tall.
    #[default]
    Standard,
    /// 3840 px tall.
    Upscaled,
}

impl ExportQuality {
    /// Fixed canvas height of this tier.
    pub fn height(self) -> u32 {
        match self {
            Self::Standard => 1920,
            Self::Upscaled => 3840,
        }
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red channel premultiplied by alpha.
    pub r: u8,
    /// Green channel premultiplied by alpha.
    pub g: u8,
    /// Blue channel premultiplied by alpha.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    /// Channels as a `[r, g, b, a]` array.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
