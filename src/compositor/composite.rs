use crate::foundation::error::{ClipError, ClipResult};
use crate::foundation::math::mul_div255_u8;

/// Premultiplied source-over with an extra uniform opacity, over whole equal-size buffers.
pub(crate) fn premul_over_in_place_opacity(
    dst: &mut [u8],
    src: &[u8],
    opacity: f32,
) -> ClipResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(ClipError::evaluation(
            "premul_over_in_place_opacity expects equal-length rgba8 buffers",
        ));
    }
    let op = opacity_u8(opacity);
    if op == 0 {
        return Ok(());
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        over_px(d, s, op);
    }
    Ok(())
}

/// A premultiplied RGBA8 patch positioned on a larger canvas.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LayerPatch {
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) data: Vec<u8>,
}

/// Source-over of `patch` onto a `dst_width` wide canvas. Parts outside the canvas are dropped.
pub(crate) fn premul_over_patch(
    dst: &mut [u8],
    dst_width: u32,
    dst_height: u32,
    patch: &LayerPatch,
    opacity: f32,
) -> ClipResult<()> {
    if dst.len() != (dst_width as usize) * (dst_height as usize) * 4
        || patch.data.len() != (patch.width as usize) * (patch.height as usize) * 4
    {
        return Err(ClipError::evaluation("patch composite buffer size mismatch"));
    }
    let op = opacity_u8(opacity);
    if op == 0 || patch.x >= dst_width || patch.y >= dst_height {
        return Ok(());
    }
    let cols = patch.width.min(dst_width - patch.x) as usize;
    let rows = patch.height.min(dst_height - patch.y) as usize;
    for row in 0..rows {
        let src_start = row * patch.width as usize * 4;
        let dst_start = ((patch.y as usize + row) * dst_width as usize + patch.x as usize) * 4;
        let src_row = &patch.data[src_start..src_start + cols * 4];
        let dst_row = &mut dst[dst_start..dst_start + cols * 4];
        for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
            over_px(d, s, op);
        }
    }
    Ok(())
}

/// Fill every pixel with one premultiplied color.
pub(crate) fn fill_rgba8(dst: &mut [u8], px: [u8; 4]) {
    for d in dst.chunks_exact_mut(4) {
        d.copy_from_slice(&px);
    }
}

fn opacity_u8(opacity: f32) -> u16 {
    ((opacity.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16
}

fn over_px(d: &mut [u8], s: &[u8], op: u16) {
    let sa = mul_div255_u8(u16::from(s[3]), op);
    if sa == 0 {
        return;
    }
    let inv = 255u16 - u16::from(sa);
    d[3] = sa.saturating_add(mul_div255_u8(u16::from(d[3]), inv));
    for c in 0..3 {
        let sc = mul_div255_u8(u16::from(s[c]), op);
        let dc = mul_div255_u8(u16::from(d[c]), inv);
        d[c] = sc.saturating_add(dc);
    }
}
