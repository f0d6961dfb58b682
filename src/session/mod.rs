//! Editing state: the immutable session value and the editor that owns it.

/// The [`Editor`](editor::Editor): intake, asset loading and export.
pub mod editor;
/// Serializable session model.
pub mod model;
