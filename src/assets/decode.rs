use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context as _;

use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{ClipError, ClipResult};
use crate::foundation::math::premultiply_rgba8_in_place;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Decoded raster (image asset or video frame) in premultiplied RGBA8.
///
/// Clones share pixels and id. A new id is assigned whenever new pixels are constructed, so
/// caches keyed by [`RasterImage::id`] stay valid.
#[derive(Clone, Debug)]
pub struct RasterImage {
    id: u64,
    width: u32,
    height: u32,
    rgba8_premul: Arc<Vec<u8>>,
}

impl RasterImage {
    /// Wrap premultiplied RGBA8 bytes.
    pub fn from_premul(width: u32, height: u32, rgba8_premul: Vec<u8>) -> ClipResult<Self> {
        if width == 0 || height == 0 {
            return Err(ClipError::validation("raster width/height must be non-zero"));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| ClipError::validation("raster size overflow"))?;
        if rgba8_premul.len() != expected {
            return Err(ClipError::validation(format!(
                "raster byte len mismatch: got {}, expected {expected}",
                rgba8_premul.len()
            )));
        }
        Ok(Self {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Wrap straight-alpha RGBA8 bytes (premultiplied on the way in).
    pub fn from_straight(width: u32, height: u32, mut rgba8: Vec<u8>) -> ClipResult<Self> {
        premultiply_rgba8_in_place(&mut rgba8);
        Self::from_premul(width, height, rgba8)
    }

    /// A `width`x`height` raster filled with one color.
    pub fn solid(width: u32, height: u32, color: Rgba8Premul) -> ClipResult<Self> {
        let px = color.to_array();
        Self::from_premul(width, height, px.repeat((width as usize) * (height as usize)))
    }

    /// Process-unique id of these pixels.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// Row-major premultiplied RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.rgba8_premul
    }
}

/// Decode an encoded image (PNG, JPEG, ...) into a [`RasterImage`].
pub fn decode_image(bytes: &[u8]) -> ClipResult<RasterImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| ClipError::asset_load(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    RasterImage::from_straight(width, height, rgba.into_raw())
}

/// Read and decode an image file.
pub fn load_image_file(path: &Path) -> ClipResult<RasterImage> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read image '{}'", path.display()))
        .map_err(|e| ClipError::asset_load(format!("{e:#}")))?;
    decode_image(&bytes)
}
