use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::error::{ClipError, ClipResult};

/// Env var naming a font file for text watermarks.
pub const FONT_ENV_VAR: &str = "CLIPFRAME_FONT";

/// Preferred sans-serif families for text watermarks, most preferred first.
const PREFERRED_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Arial",
    "Helvetica",
    "Noto Sans",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// Raw font bytes used for text watermarks.
#[derive(Clone, Debug)]
pub struct FontAsset {
    path: PathBuf,
    bytes: Arc<Vec<u8>>,
    index: u32,
}

impl FontAsset {
    /// Read a TTF/OTF font file.
    pub fn load(path: &Path) -> ClipResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            ClipError::asset_load(format!("failed to read font '{}': {e}", path.display()))
        })?;
        if bytes.is_empty() {
            return Err(ClipError::asset_load(format!(
                "font '{}' is empty",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
            bytes: Arc::new(bytes),
            index: 0,
        })
    }

    /// Resolve a font: explicit path, then `CLIPFRAME_FONT`, then the system font database.
    pub fn resolve(explicit: Option<&Path>) -> ClipResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Ok(env_path) = std::env::var(FONT_ENV_VAR)
            && !env_path.trim().is_empty()
        {
            return Self::load(Path::new(env_path.trim()));
        }
        Self::find_system().ok_or_else(|| {
            ClipError::asset_load(format!("no usable font found; set {FONT_ENV_VAR}"))
        })
    }

    /// Bold sans-serif face from the system font database, if any font is installed.
    pub fn find_system() -> Option<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        let mut families: Vec<fontdb::Family<'_>> = PREFERRED_FAMILIES
            .iter()
            .map(|name| fontdb::Family::Name(*name))
            .collect();
        families.push(fontdb::Family::SansSerif);
        let query = fontdb::Query {
            families: &families,
            weight: fontdb::Weight::BOLD,
            ..fontdb::Query::default()
        };

        let id = db.query(&query).or_else(|| db.faces().next().map(|f| f.id))?;
        let path = match &db.face(id)?.source {
            fontdb::Source::File(path) | fontdb::Source::SharedFile(path, _) => path.clone(),
            fontdb::Source::Binary(_) => PathBuf::from("<system font>"),
        };
        let (bytes, index) = db.with_face_data(id, |data, index| (data.to_vec(), index))?;
        tracing::debug!(font = %path.display(), index, "resolved system font");
        Some(Self {
            path,
            bytes: Arc::new(bytes),
            index,
        })
    }

    /// Path the font was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Font file bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Face index within the font file (non-zero only for collections).
    pub fn index(&self) -> u32 {
        self.index
    }
}

/// Stateful helper for building Parley text layouts from raw font bytes.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: Option<(PathBuf, u32, String)>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            family_name: None,
        }
    }

    fn family_for(&mut self, font: &FontAsset) -> ClipResult<String> {
        if let Some((path, index, name)) = &self.family_name
            && path == font.path()
            && *index == font.index()
        {
            return Ok(name.clone());
        }

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font.bytes().to_vec()), None);
        let family_id = families
            .iter()
            .find(|(_, faces)| faces.iter().any(|f| f.index() == font.index()))
            .or_else(|| families.first())
            .map(|(id, _)| *id)
            .ok_or_else(|| ClipError::asset_load("no font families registered from font bytes"))?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ClipError::asset_load("registered font family has no name"))?
            .to_string();
        self.family_name = Some((font.path().to_path_buf(), font.index(), family_name.clone()));
        Ok(family_name)
    }

    /// Shape and lay out single-line text.
    pub(crate) fn layout_line(
        &mut self,
        text: &str,
        font: &FontAsset,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> ClipResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ClipError::validation("text size_px must be finite and > 0"));
        }

        let family_name = self.family_for(font)?;
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/text.rs"]
mod tests;
