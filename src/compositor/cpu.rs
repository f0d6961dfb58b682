use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::assets::color::ColorDef;
use crate::assets::decode::RasterImage;
use crate::assets::text::{FontAsset, TextBrushRgba8, TextLayoutEngine};
use crate::compositor::blur::blur_rgba8_premul_in_place;
use crate::compositor::composite::{
    LayerPatch, fill_rgba8, premul_over_in_place_opacity, premul_over_patch,
};
use crate::compositor::frame::FrameRGBA;
use crate::compositor::geometry::{
    Placement, background_placement, blur_radius, image_watermark_size, placement_transform,
    rotation_about_center, video_placement, watermark_box, watermark_font_size,
};
use crate::foundation::core::{Affine, Canvas, Rect, Size};
use crate::foundation::error::{ClipError, ClipResult};
use crate::session::model::{
    Anchor, BackgroundSpec, EditSession, LoadedAssets, WatermarkContent, WatermarkSpec,
};

const MAX_CACHED_IMAGES: usize = 8;

/// Per-frame compositor on top of `vello_cpu`.
///
/// Layer order is background, video, watermark. The struct only holds caches derived from its
/// inputs, so calling [`Compositor::composite`] twice with the same inputs writes identical
/// pixels.
pub struct Compositor {
    ctx: Option<vello_cpu::RenderContext>,
    pixmap: Option<vello_cpu::Pixmap>,
    text: TextLayoutEngine,
    font: Option<(PathBuf, vello_cpu::peniko::FontData)>,
    image_cache: HashMap<u64, vello_cpu::Image>,
    background: Option<(BackgroundKey, Vec<u8>)>,
    watermark: Option<(WatermarkKey, Option<LayerPatch>)>,
    blur_tmp: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
struct BackgroundKey {
    asset: u64,
    canvas: Canvas,
    blur_bits: u64,
}

#[derive(Clone, Debug, PartialEq)]
enum WatermarkSource {
    Text {
        content: String,
        color: [u8; 4],
        font: Option<PathBuf>,
    },
    Image {
        asset: u64,
        size_bits: u64,
    },
}

#[derive(Clone, Debug, PartialEq)]
struct WatermarkKey {
    source: WatermarkSource,
    anchor: Anchor,
    canvas: Canvas,
    rotation_bits: u64,
    blur_bits: u64,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    /// Compositor with empty caches.
    pub fn new() -> Self {
        Self {
            ctx: None,
            pixmap: None,
            text: TextLayoutEngine::new(),
            font: None,
            image_cache: HashMap::new(),
            background: None,
            watermark: None,
            blur_tmp: Vec::new(),
        }
    }

    /// Draw one frame into `canvas`.
    ///
    /// `video` is the current source frame; `None` leaves the video layer empty.
    pub fn composite(
        &mut self,
        canvas: &mut FrameRGBA,
        video: Option<&RasterImage>,
        session: &EditSession,
        assets: &LoadedAssets,
    ) -> ClipResult<()> {
        let size = canvas.canvas();
        canvas_u16(size)?;
        if canvas.data.len() != size.width as usize * size.height as usize * 4 {
            return Err(ClipError::evaluation("canvas buffer does not match its size"));
        }
        canvas.premultiplied = true;

        fill_rgba8(&mut canvas.data, [0, 0, 0, 0]);
        self.draw_background(canvas, &session.background, assets)?;
        if let Some(frame) = video {
            self.draw_video(canvas, frame, session.crop.effective_zoom())?;
        }
        if let Some(wm) = &session.watermark {
            self.draw_watermark(canvas, wm, assets)?;
        }
        Ok(())
    }

    fn draw_background(
        &mut self,
        canvas: &mut FrameRGBA,
        background: &BackgroundSpec,
        assets: &LoadedAssets,
    ) -> ClipResult<()> {
        match background {
            BackgroundSpec::Color { value } => {
                fill_rgba8(&mut canvas.data, value.to_rgba8_premul().to_array());
            }
            BackgroundSpec::Image { blur_px, .. } => {
                let Some(img) = assets.background_image.as_ref() else {
                    return Ok(());
                };
                let sigma = sanitize_sigma(*blur_px);
                let key = BackgroundKey {
                    asset: img.id(),
                    canvas: canvas.canvas(),
                    blur_bits: sigma.to_bits(),
                };
                let hit = matches!(&self.background, Some((k, _)) if *k == key);
                if !hit {
                    let layer = self.render_background(img, canvas.canvas(), sigma)?;
                    self.background = Some((key, layer));
                }
                if let Some((_, layer)) = &self.background {
                    canvas.data.copy_from_slice(layer);
                }
            }
        }
        Ok(())
    }

    /// Cover crop first, blur second.
    fn render_background(
        &mut self,
        img: &RasterImage,
        canvas: Canvas,
        sigma: f64,
    ) -> ClipResult<Vec<u8>> {
        let paint = self.asset_paint(img)?;
        let placement = background_placement(raster_size(img), canvas.size());
        let mut data = self.rasterize(canvas, |ctx| {
            fill_placed(ctx, paint, placement, Affine::IDENTITY);
        })?;
        blur_rgba8_premul_in_place(
            &mut data,
            &mut self.blur_tmp,
            canvas.width,
            canvas.height,
            sigma,
        )?;
        tracing::debug!(
            asset = img.id(),
            width = canvas.width,
            height = canvas.height,
            sigma,
            "rendered background layer"
        );
        Ok(data)
    }

    fn draw_video(
        &mut self,
        canvas: &mut FrameRGBA,
        frame: &RasterImage,
        zoom: f64,
    ) -> ClipResult<()> {
        let paint = raster_to_paint(frame)?;
        let placement = video_placement(raster_size(frame), canvas.canvas().size(), zoom);
        let layer = self.rasterize(canvas.canvas(), |ctx| {
            fill_placed(ctx, paint, placement, Affine::IDENTITY);
        })?;
        premul_over_in_place_opacity(&mut canvas.data, &layer, 1.0)
    }

    fn draw_watermark(
        &mut self,
        canvas: &mut FrameRGBA,
        wm: &WatermarkSpec,
        assets: &LoadedAssets,
    ) -> ClipResult<()> {
        let source = match &wm.content {
            WatermarkContent::Text { content, color } => {
                if content.trim().is_empty() {
                    return Ok(());
                }
                WatermarkSource::Text {
                    content: content.clone(),
                    color: straight_rgba8(*color),
                    font: assets.font.as_ref().map(|f| f.path().to_path_buf()),
                }
            }
            WatermarkContent::Image { size_percent, .. } => {
                let Some(img) = assets.watermark_image.as_ref() else {
                    return Ok(());
                };
                WatermarkSource::Image {
                    asset: img.id(),
                    size_bits: size_percent.to_bits(),
                }
            }
        };

        let sigma = sanitize_sigma(wm.blur_px);
        let key = WatermarkKey {
            source,
            anchor: wm.anchor,
            canvas: canvas.canvas(),
            rotation_bits: wm.rotation_deg.to_bits(),
            blur_bits: sigma.to_bits(),
        };
        let hit = matches!(&self.watermark, Some((k, _)) if *k == key);
        if !hit {
            let patch = self.render_watermark(&key, wm, assets)?;
            self.watermark = Some((key, patch));
        }

        if let Some((_, Some(patch))) = &self.watermark {
            premul_over_patch(
                &mut canvas.data,
                canvas.width,
                canvas.height,
                patch,
                wm.opacity.clamp(0.0, 1.0) as f32,
            )?;
        }
        Ok(())
    }

    fn render_watermark(
        &mut self,
        key: &WatermarkKey,
        wm: &WatermarkSpec,
        assets: &LoadedAssets,
    ) -> ClipResult<Option<LayerPatch>> {
        let canvas = key.canvas;
        let sigma = f64::from_bits(key.blur_bits);
        match &key.source {
            WatermarkSource::Text { content, color, .. } => {
                let Some(font) = assets.font.as_ref() else {
                    tracing::warn!("text watermark skipped: no font loaded");
                    return Ok(None);
                };
                let font_data = self.font_data(font);
                let font_size = watermark_font_size(f64::from(canvas.height));
                let [r, g, b, a] = *color;
                let layout = self.text.layout_line(
                    content,
                    font,
                    font_size as f32,
                    TextBrushRgba8 { r, g, b, a },
                )?;

                let text_box = Size::new(f64::from(layout.width()), font_size);
                let bx = watermark_box(wm.anchor, text_box, canvas.size());
                let local = Rect::new(
                    0.0,
                    0.0,
                    f64::from(layout.full_width()).max(text_box.width),
                    f64::from(layout.height()).max(font_size),
                );
                let transform = rotation_about_center(bx, wm.rotation_deg)
                    * Affine::translate(bx.origin().to_vec2());
                let bounds = transform.transform_rect_bbox(local);

                render_patch(canvas, bounds, sigma, &mut self.blur_tmp, |ctx, shift| {
                    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
                    ctx.set_transform(affine_to_cpu(shift * transform));
                    for line in layout.lines() {
                        for item in line.items() {
                            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                                continue;
                            };
                            let brush = run.style().brush;
                            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                                brush.r, brush.g, brush.b, brush.a,
                            ));
                            // Absolute pen positions: run offset plus advances, on the baseline.
                            let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                                id: g.id,
                                x: g.x,
                                y: g.y,
                            });
                            ctx.glyph_run(&font_data)
                                .font_size(run.run().font_size())
                                .fill_glyphs(glyphs);
                        }
                    }
                })
            }
            WatermarkSource::Image { .. } => {
                let (Some(img), WatermarkContent::Image { size_percent, .. }) =
                    (assets.watermark_image.as_ref(), &wm.content)
                else {
                    return Ok(None);
                };
                let size =
                    image_watermark_size(f64::from(canvas.width), *size_percent, img.aspect());
                if size.width <= 0.0 || size.height <= 0.0 {
                    return Ok(None);
                }
                let bx = watermark_box(wm.anchor, size, canvas.size());
                let rotation = rotation_about_center(bx, wm.rotation_deg);
                let bounds = rotation.transform_rect_bbox(bx);
                let placement = Placement {
                    src: raster_size(img).to_rect(),
                    dst: bx,
                };
                let paint = self.asset_paint(img)?;

                render_patch(canvas, bounds, sigma, &mut self.blur_tmp, |ctx, shift| {
                    fill_placed(ctx, paint, placement, shift * rotation);
                })
            }
        }
    }

    /// Run `draw` on a canvas-sized context and read the result back.
    fn rasterize(
        &mut self,
        canvas: Canvas,
        draw: impl FnOnce(&mut vello_cpu::RenderContext),
    ) -> ClipResult<Vec<u8>> {
        let (w, h) = canvas_u16(canvas)?;
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w && ctx.height() == h => ctx,
            _ => vello_cpu::RenderContext::new(w, h),
        };
        ctx.reset();
        draw(&mut ctx);
        ctx.flush();

        let mut pixmap = match self.pixmap.take() {
            Some(p) if p.width() == w && p.height() == h => p,
            _ => vello_cpu::Pixmap::new(w, h),
        };
        pixmap.data_as_u8_slice_mut().fill(0);
        ctx.render_to_pixmap(&mut pixmap);
        let out = pixmap.data_as_u8_slice().to_vec();

        self.ctx = Some(ctx);
        self.pixmap = Some(pixmap);
        Ok(out)
    }

    fn asset_paint(&mut self, img: &RasterImage) -> ClipResult<vello_cpu::Image> {
        if let Some(paint) = self.image_cache.get(&img.id()) {
            return Ok(paint.clone());
        }
        if self.image_cache.len() >= MAX_CACHED_IMAGES {
            self.image_cache.clear();
        }
        let paint = raster_to_paint(img)?;
        self.image_cache.insert(img.id(), paint.clone());
        Ok(paint)
    }

    fn font_data(&mut self, font: &FontAsset) -> vello_cpu::peniko::FontData {
        if let Some((path, data)) = &self.font
            && path == font.path()
            && data.index == font.index()
        {
            return data.clone();
        }
        let data = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font.bytes().to_vec()),
            font.index(),
        );
        self.font = Some((font.path().to_path_buf(), data.clone()));
        data
    }
}

/// Rasterize a small canvas region around `bounds`, padded for the blur, then blur it.
fn render_patch(
    canvas: Canvas,
    bounds: Rect,
    sigma: f64,
    blur_tmp: &mut Vec<u8>,
    draw: impl FnOnce(&mut vello_cpu::RenderContext, Affine),
) -> ClipResult<Option<LayerPatch>> {
    let pad = f64::from(blur_radius(sigma)) + 1.0;
    let b = bounds.inflate(pad, pad);
    let x0 = b.x0.floor().max(0.0);
    let y0 = b.y0.floor().max(0.0);
    let x1 = b.x1.ceil().min(f64::from(canvas.width));
    let y1 = b.y1.ceil().min(f64::from(canvas.height));
    if !(x1 > x0 && y1 > y0) {
        return Ok(None);
    }

    let patch_canvas = Canvas {
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    };
    let (w, h) = canvas_u16(patch_canvas)?;
    let mut ctx = vello_cpu::RenderContext::new(w, h);
    draw(&mut ctx, Affine::translate((-x0, -y0)));
    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    ctx.render_to_pixmap(&mut pixmap);

    let mut data = pixmap.data_as_u8_slice().to_vec();
    blur_rgba8_premul_in_place(
        &mut data,
        blur_tmp,
        patch_canvas.width,
        patch_canvas.height,
        sigma,
    )?;
    Ok(Some(LayerPatch {
        x: x0 as u32,
        y: y0 as u32,
        width: patch_canvas.width,
        height: patch_canvas.height,
        data,
    }))
}

/// Fill `placement.src` (in image space) mapped onto `placement.dst`, then through `outer`.
fn fill_placed(
    ctx: &mut vello_cpu::RenderContext,
    paint: vello_cpu::Image,
    placement: Placement,
    outer: Affine,
) {
    let src = placement.src;
    if src.width() <= 0.0 || src.height() <= 0.0 {
        return;
    }
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(affine_to_cpu(outer * placement_transform(placement)));
    ctx.set_paint(paint);
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(src.x0, src.y0, src.x1, src.y1));
}

fn raster_to_paint(img: &RasterImage) -> ClipResult<vello_cpu::Image> {
    let (w, h) = canvas_u16(Canvas {
        width: img.width(),
        height: img.height(),
    })?;

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(img.width() as usize * img.height() as usize);
    for px in img.data().chunks_exact(4) {
        may_have_opacities |= px[3] != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        });
    }
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, may_have_opacities);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn raster_size(img: &RasterImage) -> Size {
    Size::new(f64::from(img.width()), f64::from(img.height()))
}

fn canvas_u16(canvas: Canvas) -> ClipResult<(u16, u16)> {
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| ClipError::evaluation("canvas width exceeds u16"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| ClipError::evaluation("canvas height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(ClipError::evaluation("canvas must be non-empty"));
    }
    Ok((w, h))
}

fn sanitize_sigma(sigma: f64) -> f64 {
    if sigma.is_finite() { sigma.max(0.0) } else { 0.0 }
}

fn straight_rgba8(c: ColorDef) -> [u8; 4] {
    let to_u8 = |x: f64| (x.clamp(0.0, 1.0) * 255.0).round() as u8;
    [to_u8(c.r), to_u8(c.g), to_u8(c.b), to_u8(c.a)]
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/cpu.rs"]
mod tests;
