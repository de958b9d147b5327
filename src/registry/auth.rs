//! Token endpoint access for Bearer-authenticated registries

use crate::config::AuthConfig;
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Token endpoint response. Registries disagree on the field name, so all of
/// the common spellings are accepted and the first non-empty one wins.
#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, rename = "Token")]
    capitalized_token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl TokenResponse {
    fn into_token(self) -> Option<String> {
        [self.token, self.capitalized_token, self.access_token]
            .into_iter()
            .flatten()
            .find(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Auth {
    client: Client,
    timeout: Duration,
    output: Logger,
}

impl Auth {
    pub fn new(client: Client, timeout: Duration, output: Logger) -> Self {
        Self {
            client,
            timeout,
            output,
        }
    }

    /// `GET {realm}?service=..&scope=..`, with Basic credentials when given.
    ///
    /// Non-200 responses and bodies without a token are failures; nothing is
    /// retried here.
    pub async fn fetch_token(
        &self,
        realm: &str,
        service: &str,
        scope: &str,
        credentials: Option<&AuthConfig>,
    ) -> Result<String> {
        let url = token_url(realm, service, scope)?;
        self.output.detail(&format!("Requesting token from: {}", url));

        let mut request = self.client.get(url).timeout(self.timeout);
        if let Some(auth) = credentials {
            self.output
                .detail(&format!("Using credentials for user: {}", auth.username));
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RegistryError::Network(format!("token request timed out: {}", e))
            } else {
                RegistryError::TokenFetch(format!("token endpoint unreachable: {}", e))
            }
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            self.output
                .debug(&format!("Token request failed with status {}", status));
            return Err(RegistryError::TokenFetch(format!(
                "token endpoint returned status {}",
                status.as_u16()
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            RegistryError::TokenFetch(format!("failed to read token response: {}", e))
        })?;
        let parsed: TokenResponse = serde_json::from_slice(&body).map_err(|e| {
            RegistryError::TokenFetch(format!("failed to parse token response: {}", e))
        })?;

        if let Some(expires_in) = parsed.expires_in {
            self.output
                .detail(&format!("Token expires in {} seconds", expires_in));
        }

        let token = parsed.into_token().ok_or_else(|| {
            RegistryError::TokenFetch("response does not contain a token".to_string())
        })?;
        self.output
            .detail(&format!("Token obtained (length: {} chars)", token.len()));
        Ok(token)
    }
}

/// Realm URL with `service` and `scope` set, replacing any existing values
/// while keeping other query parameters.
pub fn token_url(realm: &str, service: &str, scope: &str) -> Result<Url> {
    let mut url = Url::parse(realm)
        .map_err(|e| RegistryError::TokenFetch(format!("invalid realm {:?}: {}", realm, e)))?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "service" && key != "scope")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("service", service)
        .append_pair("scope", scope);
    Ok(url)
}
