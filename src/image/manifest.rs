//! Manifest documents returned by the registry
//!
//! A response body decodes into one of two shapes, picked by which fields are
//! present: a manifest list (`manifests`) or a single image manifest (`config`).

use serde::{Deserialize, Serialize};

pub const MANIFEST_LIST_V2: &str = "application/vnd.docker.distribution.manifest.list.v2+json";
pub const MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// `Accept` header for manifest requests: lists preferred, single manifests as fallback.
pub const MANIFEST_ACCEPT: &str = concat!(
    "application/vnd.docker.distribution.manifest.list.v2+json, ",
    "application/vnd.docker.distribution.manifest.v2+json;q=0.9"
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestDocument {
    List(ManifestList),
    Image(ImageManifest),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestList {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub media_type: String,
    pub manifests: Vec<PlatformManifest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformManifest {
    pub digest: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub architecture: String,
    pub os: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub media_type: String,
    pub config: Descriptor,
    #[serde(default)]
    pub layers: Vec<Descriptor>,
}

/// Config or layer blob reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub size: u64,
    pub digest: String,
}

impl ManifestDocument {
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    pub fn schema_version(&self) -> u32 {
        match self {
            ManifestDocument::List(list) => list.schema_version,
            ManifestDocument::Image(image) => image.schema_version,
        }
    }

    pub fn media_type(&self) -> &str {
        match self {
            ManifestDocument::List(list) => &list.media_type,
            ManifestDocument::Image(image) => &image.media_type,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, ManifestDocument::List(_))
    }
}

impl ManifestList {
    /// Digest of the entry built for `os`/`architecture`, if the list has one.
    pub fn digest_for(&self, os: &str, architecture: &str) -> Option<&str> {
        self.manifests
            .iter()
            .find(|entry| {
                entry
                    .platform
                    .as_ref()
                    .is_some_and(|p| p.os == os && p.architecture == architecture)
            })
            .map(|entry| entry.digest.as_str())
    }
}

impl ImageManifest {
    pub fn total_size(&self) -> u64 {
        self.config.size + self.layers.iter().map(|layer| layer.size).sum::<u64>()
    }
}

/// Whether an image changed since it was last observed. A first observation
/// counts as a change.
pub fn has_changed(previous: Option<&ManifestDocument>, current: &ManifestDocument) -> bool {
    previous != Some(current)
}
