//! Image reference parsing with Docker Hub defaulting rules

use std::fmt;

/// Registry host used for references without a registry-qualified first segment.
pub const DOCKER_HUB_HOST: &str = "registry-1.docker.io";

pub const DEFAULT_TAG: &str = "latest";

const OFFICIAL_NAMESPACE: &str = "library";

/// Location of a tagged image: `https://{host}/v2/{repository}/manifests/{tag}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    pub host: String,
    pub repository: String,
    pub tag: String,
}

impl ImageReference {
    /// Splits an image string into host, repository and tag.
    ///
    /// Never fails: malformed input degrades to a best-effort reference.
    ///
    /// - The tag is whatever follows the last `:` that comes after the last `/`,
    ///   so a registry port such as `localhost:5000/app` is not mistaken for a tag.
    /// - A first segment containing `.` or `:` names the host.
    /// - Anything else resolves to Docker Hub; single-segment names live under `library/`.
    pub fn parse(image: &str) -> Self {
        let last_slash = image.rfind('/').map_or(0, |idx| idx + 1);
        let (name, tag) = match image[last_slash..].rfind(':') {
            Some(idx) => {
                let split = last_slash + idx;
                (&image[..split], &image[split + 1..])
            }
            None => (image, DEFAULT_TAG),
        };

        let (host, repository) = match name.split_once('/') {
            Some((first, rest)) if is_registry_host(first) => {
                (first.to_string(), rest.to_string())
            }
            Some(_) => (DOCKER_HUB_HOST.to_string(), name.to_string()),
            None => (
                DOCKER_HUB_HOST.to_string(),
                format!("{}/{}", OFFICIAL_NAMESPACE, name),
            ),
        };

        Self {
            host,
            repository,
            tag: tag.to_string(),
        }
    }

    pub fn is_docker_hub(&self) -> bool {
        self.host == DOCKER_HUB_HOST
    }

    /// Manifest endpoint path, without scheme or host.
    pub fn manifest_path(&self) -> String {
        format!("/v2/{}/manifests/{}", self.repository, self.tag)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.host, self.repository, self.tag)
    }
}

fn is_registry_host(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':')
}
