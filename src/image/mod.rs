//! Image references and the manifest documents describing them

pub mod manifest;
pub mod reference;

pub use manifest::{ImageManifest, ManifestDocument, ManifestList, has_changed};
pub use reference::{DOCKER_HUB_HOST, ImageReference};
