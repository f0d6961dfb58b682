use std::path::{Path, PathBuf};

use crate::assets::color::ColorDef;
use crate::assets::decode::RasterImage;
use crate::assets::intake::{IntakeKind, check_intake, suggested_output_name};
use crate::assets::loader::{PendingImage, load_image_async};
use crate::assets::media::{SourceMedia, probe_video};
use crate::assets::text::FontAsset;
use crate::capture::driver::{CancelToken, CaptureDriver, CapturePorts, RenderJob};
use crate::compositor::frame::FrameRGBA;
use crate::encode::sink::RecordingOutput;
use crate::foundation::error::{ClipError, ClipResult};
use crate::session::model::{
    BackgroundSpec, EditSession, LoadedAssets, MusicSpec, WatermarkContent, WatermarkSpec,
    default_image_size_percent,
};

/// Whether the editor accepts edits or is busy exporting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditorMode {
    /// Interactive editing.
    #[default]
    Editing,
    /// An export is running.
    Processing,
}

/// What a slot held when an image load was requested.
///
/// A finished load is installed only while the slot still holds the same thing; an edit made in
/// the meantime wins over the load.
#[derive(Clone, Debug, PartialEq)]
enum SlotSource {
    Empty,
    Text(String),
    Color(ColorDef),
    Image(PathBuf),
}

impl SlotSource {
    fn of_watermark(wm: Option<&WatermarkSpec>) -> Self {
        match wm.map(|w| &w.content) {
            None => Self::Empty,
            Some(WatermarkContent::Text { content, .. }) => Self::Text(content.clone()),
            Some(WatermarkContent::Image { source, .. }) => Self::Image(source.clone()),
        }
    }

    fn of_background(bg: &BackgroundSpec) -> Self {
        match bg {
            BackgroundSpec::Color { value } => Self::Color(*value),
            BackgroundSpec::Image { source, .. } => Self::Image(source.clone()),
        }
    }
}

struct PendingSlot {
    load: PendingImage,
    path: PathBuf,
    requested_over: SlotSource,
}

/// Owns the editing state: session, probed source, decoded assets and the export driver.
///
/// Intake methods check the MIME type before touching anything, so a rejected file leaves the
/// editor exactly as it was. Images decode on worker threads and only replace the current asset
/// once [`Editor::poll_assets`] sees them finish successfully.
pub struct Editor {
    session: EditSession,
    media: Option<SourceMedia>,
    assets: LoadedAssets,
    mode: EditorMode,
    watermark_load: Option<PendingSlot>,
    background_load: Option<PendingSlot>,
    font_path: Option<PathBuf>,
    driver: CaptureDriver,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    /// Empty editor with default settings.
    pub fn new() -> Self {
        Self {
            session: EditSession::default(),
            media: None,
            assets: LoadedAssets::default(),
            mode: EditorMode::Editing,
            watermark_load: None,
            background_load: None,
            font_path: None,
            driver: CaptureDriver::new(),
        }
    }

    /// Editor for a saved session: probes its video and decodes its images.
    ///
    /// Blocks until every image is loaded; the first failure is returned.
    pub fn from_session(session: EditSession, font_path: Option<PathBuf>) -> ClipResult<Self> {
        session.validate()?;
        let mut editor = Self::new().with_font_path(font_path);
        if let Some(video) = session.video.as_deref() {
            editor.media = Some(probe_video(video)?);
        }
        if let Some(WatermarkContent::Image { source, .. }) =
            session.watermark.as_ref().map(|w| &w.content)
        {
            editor.watermark_load = Some(PendingSlot {
                load: load_image_async(source.clone()),
                path: source.clone(),
                requested_over: SlotSource::Image(source.clone()),
            });
        }
        if let BackgroundSpec::Image { source, .. } = &session.background {
            editor.background_load = Some(PendingSlot {
                load: load_image_async(source.clone()),
                path: source.clone(),
                requested_over: SlotSource::Image(source.clone()),
            });
        }
        editor.session = session;
        editor.wait_assets()?;
        editor.ensure_font();
        Ok(editor)
    }

    /// Replace the export driver (e.g. one with a progress callback).
    pub fn with_driver(mut self, driver: CaptureDriver) -> Self {
        self.driver = driver;
        self
    }

    /// Font file to prefer for text watermarks.
    pub fn with_font_path(mut self, path: Option<PathBuf>) -> Self {
        self.font_path = path;
        self
    }

    /// Current session.
    pub fn session(&self) -> &EditSession {
        &self.session
    }

    /// Probed source video, once loaded.
    pub fn media(&self) -> Option<&SourceMedia> {
        self.media.as_ref()
    }

    /// Decoded assets.
    pub fn assets(&self) -> &LoadedAssets {
        &self.assets
    }

    /// Current mode.
    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    /// Status of the current or last export.
    pub fn job(&self) -> &RenderJob {
        self.driver.job()
    }

    /// Token cancelling a running export.
    pub fn cancel_token(&self) -> CancelToken {
        self.driver.cancel_token()
    }

    /// `true` while an image load is still running.
    pub fn has_pending_loads(&self) -> bool {
        self.watermark_load.is_some() || self.background_load.is_some()
    }

    /// Offer a video file; probes it with `ffprobe`.
    pub fn load_video(&mut self, path: &Path, mime: &str) -> ClipResult<()> {
        check_intake(&display_name(path), mime, IntakeKind::Video)?;
        let media = probe_video(path)?;
        self.set_source(media);
        Ok(())
    }

    /// Install already probed source media. The trim resets to the whole clip.
    pub fn set_source(&mut self, media: SourceMedia) {
        tracing::info!(
            path = %media.path.display(),
            width = media.width,
            height = media.height,
            duration_sec = media.duration_sec,
            "source loaded"
        );
        self.session = self.session.clone().with_video(media.path.clone());
        self.media = Some(media);
    }

    /// Offer a watermark image; decoding starts in the background.
    pub fn load_watermark_image(&mut self, path: &Path, mime: &str) -> ClipResult<()> {
        check_intake(&display_name(path), mime, IntakeKind::Image)?;
        self.watermark_load = Some(PendingSlot {
            load: load_image_async(path),
            path: path.to_path_buf(),
            requested_over: SlotSource::of_watermark(self.session.watermark.as_ref()),
        });
        Ok(())
    }

    /// Offer a background image; decoding starts in the background.
    pub fn load_background_image(&mut self, path: &Path, mime: &str) -> ClipResult<()> {
        check_intake(&display_name(path), mime, IntakeKind::Image)?;
        self.background_load = Some(PendingSlot {
            load: load_image_async(path),
            path: path.to_path_buf(),
            requested_over: SlotSource::of_background(&self.session.background),
        });
        Ok(())
    }

    /// Offer a music file. It is decoded when an export starts.
    pub fn set_music(&mut self, path: &Path, mime: &str) -> ClipResult<()> {
        check_intake(&display_name(path), mime, IntakeKind::Audio)?;
        let volume = self.session.audio.music.as_ref().map_or(0.5, |m| m.volume);
        let mut audio = self.session.audio.clone();
        audio.music = Some(MusicSpec {
            source: path.to_path_buf(),
            volume,
        });
        self.session = self.session.clone().with_audio(audio);
        Ok(())
    }

    /// Install finished image loads.
    ///
    /// Returns `true` when an asset changed. A failed load is reported as
    /// [`ClipError::AssetLoad`] and the previous asset stays in place. A load whose slot was
    /// edited after the request is dropped.
    pub fn poll_assets(&mut self) -> ClipResult<bool> {
        let mut changed = false;
        let mut first_err = None;

        if let Some(res) = take_ready(&mut self.watermark_load) {
            match res {
                Ok((image, slot))
                    if slot.requested_over
                        == SlotSource::of_watermark(self.session.watermark.as_ref()) =>
                {
                    self.assets.watermark_image = Some(image);
                    let watermark = image_watermark(self.session.watermark.as_ref(), slot.path);
                    self.session = self.session.clone().with_watermark(Some(watermark));
                    changed = true;
                }
                Ok((_, slot)) => {
                    tracing::debug!(
                        path = %slot.path.display(),
                        "watermark edited during load; image dropped"
                    );
                }
                Err(e) => first_err = Some(e),
            }
        }
        if let Some(res) = take_ready(&mut self.background_load) {
            match res {
                Ok((image, slot))
                    if slot.requested_over == SlotSource::of_background(&self.session.background) =>
                {
                    let blur_px = match self.session.background {
                        BackgroundSpec::Image { blur_px, .. } => blur_px,
                        BackgroundSpec::Color { .. } => 0.0,
                    };
                    self.assets.background_image = Some(image);
                    self.session = self.session.clone().with_background(BackgroundSpec::Image {
                        source: slot.path,
                        blur_px,
                    });
                    changed = true;
                }
                Ok((_, slot)) => {
                    tracing::debug!(
                        path = %slot.path.display(),
                        "background edited during load; image dropped"
                    );
                }
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => {
                tracing::warn!(error = %e, "asset load failed");
                Err(e)
            }
            None => Ok(changed),
        }
    }

    /// Block until every pending image load resolved, then install them.
    pub fn wait_assets(&mut self) -> ClipResult<()> {
        while self.has_pending_loads() {
            if !self.poll_ready() {
                std::thread::sleep(std::time::Duration::from_millis(2));
                continue;
            }
            self.poll_assets()?;
        }
        Ok(())
    }

    fn poll_ready(&self) -> bool {
        self.watermark_load.as_ref().is_some_and(|s| s.load.is_ready())
            || self.background_load.as_ref().is_some_and(|s| s.load.is_ready())
    }

    /// Replace the session with `f(current)`; rejected sessions leave the current one in place.
    pub fn update(&mut self, f: impl FnOnce(EditSession) -> EditSession) -> ClipResult<()> {
        if self.mode == EditorMode::Processing {
            return Err(ClipError::validation("cannot edit while an export is running"));
        }
        let next = f(self.session.clone());
        next.validate()?;
        self.session = next;
        Ok(())
    }

    /// Make sure a text watermark has a font to draw with.
    ///
    /// A missing font is logged and leaves the watermark undrawable.
    pub fn ensure_font(&mut self) {
        let needs_font = matches!(
            self.session.watermark.as_ref().map(|w| &w.content),
            Some(WatermarkContent::Text { .. })
        );
        if !needs_font || self.assets.font.is_some() {
            return;
        }
        match FontAsset::resolve(self.font_path.as_deref()) {
            Ok(font) => {
                tracing::debug!(font = %font.path().display(), "font resolved");
                self.assets.font = Some(font);
            }
            Err(e) => tracing::warn!(error = %e, "text watermark has no font"),
        }
    }

    /// Composite one preview frame over `frame`.
    pub fn preview(&mut self, frame: Option<&RasterImage>) -> ClipResult<FrameRGBA> {
        self.ensure_font();
        crate::preview::render_preview(&self.session, &self.assets, frame)
    }

    /// Export the current session. Always returns to [`EditorMode::Editing`].
    pub fn export(&mut self, ports: CapturePorts<'_>) -> ClipResult<RecordingOutput> {
        self.ensure_font();
        self.mode = EditorMode::Processing;
        let result = self.driver.export(&self.session, &self.assets, ports);
        self.mode = EditorMode::Editing;
        result
    }

    /// Default output file name for the loaded source.
    pub fn suggested_output_name(&self) -> String {
        let name = self
            .session
            .video
            .as_deref()
            .map(display_name)
            .unwrap_or_default();
        suggested_output_name(&name)
    }

    /// Drop the source, every asset and pending load, and start over with default settings.
    pub fn reset(&mut self) {
        self.session = EditSession::default();
        self.media = None;
        self.assets = LoadedAssets::default();
        self.watermark_load = None;
        self.background_load = None;
        self.mode = EditorMode::Editing;
        self.driver.reset_job();
        tracing::debug!("editor reset");
    }
}

fn take_ready(slot: &mut Option<PendingSlot>) -> Option<ClipResult<(RasterImage, PendingSlot)>> {
    let res = slot.as_mut()?.load.try_take()?;
    let slot = slot.take()?;
    Some(res.map(|image| (image, slot)))
}

fn image_watermark(prev: Option<&WatermarkSpec>, source: PathBuf) -> WatermarkSpec {
    match prev {
        Some(prev) => {
            let size_percent = match prev.content {
                WatermarkContent::Image { size_percent, .. } => size_percent,
                WatermarkContent::Text { .. } => default_image_size_percent(),
            };
            WatermarkSpec {
                content: WatermarkContent::Image {
                    source,
                    size_percent,
                },
                ..prev.clone()
            }
        }
        None => WatermarkSpec::image(source, default_image_size_percent()),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
#[path = "../../tests/unit/session/editor.rs"]
mod tests;
