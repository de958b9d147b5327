//! Client configuration: transport settings and per-host credentials

use crate::error::{RegistryError, Result};
use crate::image::reference::DOCKER_HUB_HOST;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

impl AuthConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(RegistryError::Validation(
                "Username cannot be empty".to_string(),
            ));
        }
        if self.password.is_empty() {
            return Err(RegistryError::Validation(
                "Password cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Scheme used to reach a registry host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    #[default]
    Https,
    Http,
    /// HTTPS everywhere except the listed hosts
    HttpsExcept(Vec<String>),
}

impl Protocol {
    pub fn scheme_for(&self, host: &str) -> &'static str {
        match self {
            Protocol::Https => "https",
            Protocol::Http => "http",
            Protocol::HttpsExcept(hosts) => {
                if hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
                    "http"
                } else {
                    "https"
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Per-request timeout for both manifest and token requests
    pub timeout: Duration,
    pub protocol: Protocol,
    pub user_agent: String,
    /// Credentials keyed by lower-cased registry host
    pub credentials: HashMap<String, AuthConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            protocol: Protocol::default(),
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            credentials: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Reads `REGISTRY_TIMEOUT`, `REGISTRY_INSECURE`, `REGISTRY_HOST`,
    /// `REGISTRY_USERNAME` and `REGISTRY_PASSWORD`. Unset variables keep defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup("REGISTRY_TIMEOUT") {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                RegistryError::Validation(format!("REGISTRY_TIMEOUT is not a number: {}", raw))
            })?;
            config = config.with_timeout(Duration::from_secs(secs))?;
        }

        if let Some(raw) = lookup("REGISTRY_INSECURE") {
            let hosts: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .collect();
            if !hosts.is_empty() {
                config.protocol = Protocol::HttpsExcept(hosts);
            }
        }

        match (lookup("REGISTRY_USERNAME"), lookup("REGISTRY_PASSWORD")) {
            (Some(username), Some(password)) => {
                let host = lookup("REGISTRY_HOST").unwrap_or_else(|| DOCKER_HUB_HOST.to_string());
                config = config.with_credentials(&host, AuthConfig::new(username, password))?;
            }
            (Some(_), None) => {
                return Err(RegistryError::Validation(
                    "REGISTRY_PASSWORD is required when REGISTRY_USERNAME is set".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(RegistryError::Validation(
                    "REGISTRY_USERNAME is required when REGISTRY_PASSWORD is set".to_string(),
                ));
            }
            (None, None) => {}
        }

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(RegistryError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_credentials(mut self, host: &str, auth: AuthConfig) -> Result<Self> {
        auth.validate()?;
        self.credentials.insert(host.to_lowercase(), auth);
        Ok(self)
    }
}
