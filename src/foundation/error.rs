/// Convenience result type for `clipframe`.
pub type ClipResult<T> = Result<T, ClipError>;

/// Error kinds surfaced by the editor core.
///
/// Every variant is recoverable from the session's point of view: callers show the message and
/// keep the previous editing state.
#[derive(thiserror::Error, Debug)]
pub enum ClipError {
    /// Intake rejected a file (wrong MIME type for the target slot).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Export requested with `trim.end <= trim.start`.
    #[error("invalid range: trim end {end:.3}s must be after trim start {start:.3}s")]
    InvalidRange {
        /// Requested trim start in seconds.
        start: f64,
        /// Requested trim end in seconds.
        end: f64,
    },

    /// A watermark/background image or music file could not be decoded.
    #[error("asset load failure: {0}")]
    AssetLoad(String),

    /// The media engine refused to start playback.
    #[error("playback start failure: {0}")]
    PlaybackStart(String),

    /// A value failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Rendering, decoding or encoding failed.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// The export was cancelled and its output discarded.
    #[error("export cancelled")]
    Cancelled,

    /// Any other error, with context.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClipError {
    /// Build an [`ClipError::InvalidInput`].
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Build an [`ClipError::AssetLoad`].
    pub fn asset_load(msg: impl Into<String>) -> Self {
        Self::AssetLoad(msg.into())
    }

    /// Build an [`ClipError::PlaybackStart`].
    pub fn playback_start(msg: impl Into<String>) -> Self {
        Self::PlaybackStart(msg.into())
    }

    /// Build an [`ClipError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build an [`ClipError::Evaluation`].
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
