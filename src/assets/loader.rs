use std::path::PathBuf;
use std::thread::JoinHandle;

use crate::assets::decode::{RasterImage, load_image_file};
use crate::foundation::error::{ClipError, ClipResult};

/// An asset load running off the editing thread.
///
/// The asset is unusable until the load resolves; callers poll with [`PendingLoad::try_take`]
/// between frames or block with [`PendingLoad::wait`].
pub struct PendingLoad<T> {
    label: String,
    handle: Option<JoinHandle<ClipResult<T>>>,
}

impl<T: Send + 'static> PendingLoad<T> {
    /// Start `load` on a worker thread.
    pub fn spawn(
        label: impl Into<String>,
        load: impl FnOnce() -> ClipResult<T> + Send + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            handle: Some(std::thread::spawn(load)),
        }
    }

    /// What is being loaded (for messages).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// `true` once the worker finished (successfully or not).
    pub fn is_ready(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Take the result if the load has finished. Returns `None` while still running and after
    /// the result was taken.
    pub fn try_take(&mut self) -> Option<ClipResult<T>> {
        if !self.handle.as_ref().is_some_and(|h| h.is_finished()) {
            return None;
        }
        let handle = self.handle.take()?;
        Some(join(&self.label, handle))
    }

    /// Block until the load resolves.
    pub fn wait(mut self) -> ClipResult<T> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| ClipError::asset_load(format!("{} was already taken", self.label)))?;
        join(&self.label, handle)
    }
}

fn join<T>(label: &str, handle: JoinHandle<ClipResult<T>>) -> ClipResult<T> {
    handle
        .join()
        .map_err(|_| ClipError::asset_load(format!("{label}: loader thread panicked")))?
}

/// A watermark or background image being decoded off-thread.
pub type PendingImage = PendingLoad<RasterImage>;

/// Decode an image file in the background.
pub fn load_image_async(path: impl Into<PathBuf>) -> PendingImage {
    let path = path.into();
    let label = format!("image '{}'", path.display());
    PendingLoad::spawn(label, move || load_image_file(&path))
}
