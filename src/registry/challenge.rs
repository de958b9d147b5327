//! `WWW-Authenticate` challenge parsing
//!
//! Only the `Bearer realm="...",service="...",scope="..."` form that registries
//! actually send is understood. Parameters are picked out as `key="value"` pairs;
//! anything else in the header is ignored.

use crate::error::ChallengeError;
use std::collections::HashMap;

pub const BEARER_SCHEME: &str = "Bearer";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub scheme: String,
    pub params: HashMap<String, String>,
}

impl AuthChallenge {
    pub fn parse(header: &str) -> Result<Self, ChallengeError> {
        let (scheme, rest) = header.split_once(' ').ok_or(ChallengeError::Malformed)?;
        if scheme != BEARER_SCHEME {
            return Err(ChallengeError::UnsupportedScheme(scheme.to_string()));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            params: quoted_params(rest),
        })
    }

    /// Parameter value, or `""` when the registry did not send it.
    pub fn param(&self, key: &str) -> &str {
        self.params.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn realm(&self) -> &str {
        self.param("realm")
    }

    pub fn service(&self) -> &str {
        self.param("service")
    }

    pub fn scope(&self) -> &str {
        self.param("scope")
    }
}

fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Collects every `key="value"` occurrence, left to right. A later duplicate key wins.
fn quoted_params(input: &str) -> HashMap<String, String> {
    let bytes = input.as_bytes();
    let mut params = HashMap::new();
    let mut i = 0;

    while i < bytes.len() {
        if !is_key_byte(bytes[i]) {
            i += 1;
            continue;
        }

        let key_start = i;
        while i < bytes.len() && is_key_byte(bytes[i]) {
            i += 1;
        }
        let key_end = i;

        if !input[key_end..].starts_with("=\"") {
            continue;
        }
        let value_start = key_end + 2;
        let Some(len) = input[value_start..].find('"') else {
            continue;
        };
        let value_end = value_start + len;

        params.insert(
            input[key_start..key_end].to_string(),
            input[value_start..value_end].to_string(),
        );
        i = value_end + 1;
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearer_challenge() {
        let challenge = AuthChallenge::parse(
            r#"Bearer realm="https://auth.example/token",service="registry.example",scope="repository:x:pull""#,
        )
        .unwrap();

        assert_eq!(challenge.scheme, "Bearer");
        assert_eq!(challenge.params.len(), 3);
        assert_eq!(challenge.realm(), "https://auth.example/token");
        assert_eq!(challenge.service(), "registry.example");
        assert_eq!(challenge.scope(), "repository:x:pull");
    }

    #[test]
    fn test_missing_params_are_empty() {
        let challenge =
            AuthChallenge::parse(r#"Bearer realm="https://auth.example/token""#).unwrap();
        assert_eq!(challenge.service(), "");
        assert_eq!(challenge.scope(), "");
    }

    #[test]
    fn test_extra_fields_and_noise_are_tolerated() {
        let challenge = AuthChallenge::parse(
            r#"Bearer realm="https://ghcr.io/token", service="ghcr.io",scope="repository:a/b:pull",error="insufficient_scope", junk, broken="unterminated"#,
        )
        .unwrap();

        assert_eq!(challenge.realm(), "https://ghcr.io/token");
        assert_eq!(challenge.scope(), "repository:a/b:pull");
        assert_eq!(challenge.param("error"), "insufficient_scope");
        assert!(!challenge.params.contains_key("broken"));
        assert!(!challenge.params.contains_key("junk"));
    }

    #[test]
    fn test_scope_with_commas_inside_quotes() {
        let challenge =
            AuthChallenge::parse(r#"Bearer scope="repository:a:pull,push",realm="r""#).unwrap();
        assert_eq!(challenge.scope(), "repository:a:pull,push");
        assert_eq!(challenge.realm(), "r");
    }

    #[test]
    fn test_unsupported_scheme() {
        assert_eq!(
            AuthChallenge::parse(r#"Basic realm="Registry Realm""#),
            Err(ChallengeError::UnsupportedScheme("Basic".to_string()))
        );
        assert_eq!(
            AuthChallenge::parse(r#"bearer realm="x""#),
            Err(ChallengeError::UnsupportedScheme("bearer".to_string()))
        );
    }

    #[test]
    fn test_malformed_without_space() {
        assert_eq!(AuthChallenge::parse("Bearer"), Err(ChallengeError::Malformed));
        assert_eq!(AuthChallenge::parse(""), Err(ChallengeError::Malformed));
    }
}
