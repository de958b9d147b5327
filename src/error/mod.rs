//! Error types for registry operations

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// `WWW-Authenticate` header could not be used
    #[error("Challenge error: {0}")]
    Challenge(#[from] ChallengeError),
    /// Token endpoint unreachable or returned no usable token
    #[error("Failed to get token: {0}")]
    TokenFetch(String),
    /// Registry rejected the request and there is no way to recover
    #[error("Authentication error: {0}")]
    Auth(String),
    /// Registry answered with a status other than the one expected
    #[error("{0}")]
    Status(StatusError),
    /// Transport failures, timeouts and caller deadlines
    #[error("Network error: {0}")]
    Network(String),
    /// Malformed body on an otherwise successful response
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

impl RegistryError {
    /// Status code carried by the error, if the server produced one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RegistryError::Status(err) => Some(err.status),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, RegistryError::Network(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChallengeError {
    #[error("authenticate type not found")]
    Malformed,
    #[error("unknown authenticate type: {0}")]
    UnsupportedScheme(String),
}

/// A non-200 response, kept so the caller can inspect headers without
/// re-issuing the request.
#[derive(Debug, Clone)]
pub struct StatusError {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl StatusError {
    pub fn new(status: StatusCode, headers: HeaderMap) -> Self {
        Self { status, headers }
    }

    /// Case-insensitive header lookup. Values that are not valid visible
    /// ASCII are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

impl std::fmt::Display for StatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unexpected status code: {}", self.status.as_u16())
    }
}

impl From<StatusError> for RegistryError {
    fn from(err: StatusError) -> Self {
        RegistryError::Status(err)
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RegistryError::Decode(err.to_string())
        } else if err.is_timeout() {
            RegistryError::Network(format!("request timed out: {}", err))
        } else {
            RegistryError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for RegistryError {
    fn from(err: url::ParseError) -> Self {
        RegistryError::Validation(err.to_string())
    }
}
