use std::path::Path;

use crate::foundation::error::{ClipError, ClipResult};

/// Suffix appended to the input stem for the suggested output file name.
pub const OUTPUT_NAME_SUFFIX: &str = "_edited";

/// Intake slot a file is offered to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntakeKind {
    /// Source video.
    Video,
    /// Watermark or background image.
    Image,
    /// Background music.
    Audio,
}

impl IntakeKind {
    /// Required MIME type prefix.
    pub fn mime_prefix(self) -> &'static str {
        match self {
            Self::Video => "video/",
            Self::Image => "image/",
            Self::Audio => "audio/",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }
}

/// Reject files whose MIME type does not belong to `kind`.
pub fn check_intake(name: &str, mime: &str, kind: IntakeKind) -> ClipResult<()> {
    let mime = mime.trim().to_ascii_lowercase();
    if mime.starts_with(kind.mime_prefix()) {
        return Ok(());
    }
    Err(ClipError::invalid_input(format!(
        "'{name}' is not a {} file (got MIME type '{}')",
        kind.label(),
        if mime.is_empty() { "unknown" } else { mime.as_str() }
    )))
}

/// Best-effort MIME type from a file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "m4a" | "aac" => "audio/aac",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// Suggested download name: input stem plus a fixed suffix, as MP4.
pub fn suggested_output_name(input_name: &str) -> String {
    let stem = Path::new(input_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("clip");
    format!("{stem}{OUTPUT_NAME_SUFFIX}.mp4")
}

#[cfg(test)]
#[path = "../../tests/unit/assets/intake.rs"]
mod tests;
