//! Registry client for Docker Registry HTTP API v2 manifest retrieval
//!
//! A manifest request is first sent with whatever token is already cached for
//! the host. On `401` the `WWW-Authenticate` challenge is parsed, a token is
//! obtained through the [`TokenCache`], and the request is sent exactly once more.

use crate::config::{AuthConfig, ClientConfig, Protocol};
use crate::error::{RegistryError, Result, StatusError};
use crate::image::manifest::{MANIFEST_ACCEPT, ManifestDocument};
use crate::image::reference::ImageReference;
use crate::logging::Logger;
use crate::registry::auth::Auth;
use crate::registry::challenge::AuthChallenge;
use crate::registry::token_cache::TokenCache;
use reqwest::header::{ACCEPT, WWW_AUTHENTICATE};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

pub struct RegistryClientBuilder {
    config: ClientConfig,
    output: Logger,
    http: Option<Client>,
}

impl RegistryClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            output: Logger::default(),
            http: None,
        }
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.config.protocol = protocol;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn with_output(mut self, output: Logger) -> Self {
        self.output = output;
        self
    }

    /// Use an existing `reqwest::Client` instead of building one.
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<RegistryClient> {
        let http = match self.http {
            Some(http) => http,
            None => Client::builder()
                .user_agent(self.config.user_agent.clone())
                .build()
                .map_err(|e| {
                    RegistryError::Network(format!("Failed to create HTTP client: {}", e))
                })?,
        };

        let auth = Auth::new(http.clone(), self.config.timeout, self.output.clone());
        let tokens = TokenCache::new(auth, self.output.clone());

        Ok(RegistryClient {
            http,
            tokens,
            credentials: RwLock::new(self.config.credentials),
            protocol: self.config.protocol,
            timeout: self.config.timeout,
            output: self.output,
        })
    }
}

impl Default for RegistryClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Manifest client. Share one instance (behind an `Arc` if needed) so that
/// concurrent requests share its token cache.
pub struct RegistryClient {
    http: Client,
    tokens: TokenCache,
    credentials: RwLock<HashMap<String, AuthConfig>>,
    protocol: Protocol,
    timeout: Duration,
    output: Logger,
}

impl RegistryClient {
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> RegistryClientBuilder {
        RegistryClientBuilder::new()
    }

    /// Stores credentials used for token requests against `host`.
    pub fn login(&self, host: &str, username: &str, password: &str) -> Result<()> {
        let auth = AuthConfig::new(username, password);
        auth.validate()?;
        self.output
            .verbose(&format!("Stored credentials for {} as {}", host, username));
        self.credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(host.to_lowercase(), auth);
        Ok(())
    }

    /// Token currently cached for `host`, if any.
    pub fn cached_token(&self, host: &str) -> Option<String> {
        self.tokens.get_cached(host)
    }

    /// Fetches the manifest for an image reference such as `debian:bullseye-slim`
    /// or `ghcr.io/github/super-linter:v3`.
    ///
    /// Dropping the returned future cancels the in-flight request; the token
    /// cache is only written once a token has been fully received.
    pub async fn get_manifest(&self, image: &str) -> Result<ManifestDocument> {
        let reference = ImageReference::parse(image);
        self.get_manifest_for(&reference).await
    }

    /// Like [`get_manifest`](Self::get_manifest), failing with a network error
    /// once `deadline` passes.
    pub async fn get_manifest_with_deadline(
        &self,
        image: &str,
        deadline: tokio::time::Instant,
    ) -> Result<ManifestDocument> {
        tokio::time::timeout_at(deadline, self.get_manifest(image))
            .await
            .map_err(|_| RegistryError::Network(format!("deadline exceeded fetching {}", image)))?
    }

    pub async fn get_manifest_for(&self, reference: &ImageReference) -> Result<ManifestDocument> {
        let cached = self.tokens.get_cached(&reference.host);
        let err = match self.fetch_manifest(reference, cached.as_deref()).await {
            Ok(manifest) => return Ok(manifest),
            Err(RegistryError::Status(err)) if err.status == StatusCode::UNAUTHORIZED => err,
            Err(err) => return Err(err),
        };

        let header = err.header(WWW_AUTHENTICATE.as_str()).ok_or_else(|| {
            RegistryError::Auth(format!(
                "{} requires authentication but sent no challenge",
                reference.host
            ))
        })?;
        let challenge = AuthChallenge::parse(header)?;
        self.output.detail(&format!(
            "Auth challenge received: realm={}, service={}, scope={}",
            challenge.realm(),
            challenge.service(),
            challenge.scope()
        ));

        let credentials = self.credentials_for(&reference.host);
        let token = self
            .tokens
            .refresh(&reference.host, &challenge, credentials.as_ref())
            .await?;

        match self.fetch_manifest(reference, Some(&token)).await {
            Err(RegistryError::Status(err)) if err.status == StatusCode::UNAUTHORIZED => {
                Err(RegistryError::Auth(format!(
                    "{} rejected the token for {}",
                    reference.host, reference.repository
                )))
            }
            result => result,
        }
    }

    /// One manifest GET. Anything but `200` comes back as a status error.
    async fn fetch_manifest(
        &self,
        reference: &ImageReference,
        token: Option<&str>,
    ) -> Result<ManifestDocument> {
        let url = format!(
            "{}://{}{}",
            self.protocol.scheme_for(&reference.host),
            reference.host,
            reference.manifest_path()
        );
        self.output.detail(&format!(
            "GET {} ({})",
            url,
            if token.is_some() { "bearer" } else { "anonymous" }
        ));

        let mut request = self
            .http
            .get(&url)
            .header(ACCEPT, MANIFEST_ACCEPT)
            .timeout(self.timeout);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            self.output
                .debug(&format!("Manifest request for {} returned {}", reference, status));
            return Err(StatusError::new(status, response.headers().clone()).into());
        }

        let body = response.bytes().await?;
        let manifest = ManifestDocument::from_slice(&body)?;
        self.output.verbose(&format!(
            "Fetched {} ({})",
            reference,
            manifest.media_type()
        ));
        Ok(manifest)
    }

    fn credentials_for(&self, host: &str) -> Option<AuthConfig> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&host.to_lowercase())
            .cloned()
    }
}
