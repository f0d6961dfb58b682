use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::Canvas;
use crate::foundation::error::{ClipError, ClipResult};
use crate::foundation::math::unpremultiply_rgba8_in_place;

/// A canvas-sized frame as RGBA8 pixels.
///
/// Frames produced by the compositor are premultiplied alpha; the `premultiplied` flag keeps
/// that explicit at API boundaries.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Transparent frame covering `canvas`.
    pub fn new(canvas: Canvas) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            data: vec![0; canvas.width as usize * canvas.height as usize * 4],
            premultiplied: true,
        }
    }

    /// Dimensions as a [`Canvas`].
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Reallocate for `canvas` when the size differs. Contents are transparent after a resize.
    pub fn resize(&mut self, canvas: Canvas) {
        if self.canvas() == canvas {
            return;
        }
        *self = Self::new(canvas);
    }

    /// Copy of the pixels with straight (non-premultiplied) alpha.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if self.premultiplied {
            unpremultiply_rgba8_in_place(&mut out);
        }
        out
    }

    /// Write the frame as a PNG file.
    pub fn save_png(&self, path: &Path) -> ClipResult<()> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.to_straight_rgba8())
            .ok_or_else(|| ClipError::evaluation("frame byte length does not match its size"))?;
        img.save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}
