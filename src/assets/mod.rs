//! Asset intake, decoding and media probing.

pub(crate) mod color;
pub(crate) mod decode;
pub(crate) mod intake;
pub(crate) mod loader;
pub(crate) mod media;
pub(crate) mod text;
