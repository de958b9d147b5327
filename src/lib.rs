//! Docker Manifest Client Library
//!
//! Fetches image manifests from Docker Registry v2 compatible registries,
//! handling the Bearer token challenge flow and per-host token caching.

pub mod cli;
pub mod config;
pub mod error;
pub mod image;
pub mod logging;
pub mod registry;

pub use config::{AuthConfig, ClientConfig, Protocol};
pub use error::{RegistryError, Result};
pub use image::{ImageReference, ManifestDocument, has_changed};
pub use logging::Logger;
pub use registry::{RegistryClient, RegistryClientBuilder};
