//! Single-frame rendering for the interactive preview and the `frame` CLI command.

use crate::assets::decode::RasterImage;
use crate::compositor::cpu::Compositor;
use crate::compositor::frame::FrameRGBA;
use crate::foundation::core::Canvas;
use crate::foundation::error::ClipResult;
use crate::session::model::{EditSession, LoadedAssets};

/// Which canvas tier a still is rendered at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PreviewTier {
    /// Interactive preview height.
    #[default]
    Preview,
    /// The session's export resolution.
    Export,
}

impl PreviewTier {
    /// Canvas for `session` at this tier.
    pub fn canvas(self, session: &EditSession) -> Canvas {
        match self {
            Self::Preview => Canvas::for_preview(session.aspect),
            Self::Export => Canvas::for_export(session.aspect, session.quality),
        }
    }
}

/// Stateful still renderer; keeps compositor caches alive between calls.
#[derive(Default)]
pub struct PreviewRenderer {
    compositor: Compositor,
}

impl PreviewRenderer {
    /// Fresh renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Composite `frame` under `session` at `tier`.
    pub fn render(
        &mut self,
        session: &EditSession,
        assets: &LoadedAssets,
        frame: Option<&RasterImage>,
        tier: PreviewTier,
    ) -> ClipResult<FrameRGBA> {
        let mut out = FrameRGBA::new(tier.canvas(session));
        self.compositor.composite(&mut out, frame, session, assets)?;
        Ok(out)
    }
}

/// Composite one frame at the preview tier.
pub fn render_preview(
    session: &EditSession,
    assets: &LoadedAssets,
    frame: Option<&RasterImage>,
) -> ClipResult<FrameRGBA> {
    PreviewRenderer::new().render(session, assets, frame, PreviewTier::Preview)
}
