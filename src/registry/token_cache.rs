//! Per-host Bearer token cache
//!
//! Many manifest requests against one registry tend to hit `401` together.
//! Refreshes for a host are serialised by a per-host lock, and a caller that
//! waited on that lock reuses the token obtained while it was waiting instead of
//! fetching another one.

use crate::config::AuthConfig;
use crate::error::Result;
use crate::logging::Logger;
use crate::registry::auth::Auth;
use crate::registry::challenge::AuthChallenge;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    obtained_at: Instant,
}

/// Token slot for one host. `refresh` orders refreshes; `current` is only held
/// for the instant it takes to read or swap the value.
#[derive(Debug, Default)]
struct HostToken {
    refresh: Mutex<()>,
    current: RwLock<Option<CachedToken>>,
}

impl HostToken {
    fn snapshot(&self) -> Option<CachedToken> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, value: String) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(CachedToken {
            value,
            obtained_at: Instant::now(),
        });
    }
}

#[derive(Debug)]
pub struct TokenCache {
    auth: Auth,
    hosts: RwLock<HashMap<String, Arc<HostToken>>>,
    output: Logger,
}

impl TokenCache {
    pub fn new(auth: Auth, output: Logger) -> Self {
        Self {
            auth,
            hosts: RwLock::new(HashMap::new()),
            output,
        }
    }

    /// Last token stored for `host`. Never waits on an in-flight refresh.
    pub fn get_cached(&self, host: &str) -> Option<String> {
        self.slot(host)?.snapshot().map(|token| token.value)
    }

    /// Obtains a token for `host` from the challenge's realm, unless another
    /// caller stored one while this call was waiting for the host lock.
    pub async fn refresh(
        &self,
        host: &str,
        challenge: &AuthChallenge,
        credentials: Option<&AuthConfig>,
    ) -> Result<String> {
        // Taken before the lock: any token obtained after this instant was
        // fetched on behalf of a request that overlapped this one.
        let requested_at = Instant::now();
        let slot = self.slot_or_insert(host);

        let _guard = slot.refresh.lock().await;
        if let Some(cached) = slot.snapshot() {
            if cached.obtained_at > requested_at {
                self.output
                    .detail(&format!("Reusing token refreshed concurrently for {}", host));
                return Ok(cached.value);
            }
        }

        self.output.verbose(&format!("Refreshing token for {}", host));
        let token = self
            .auth
            .fetch_token(
                challenge.realm(),
                challenge.service(),
                challenge.scope(),
                credentials,
            )
            .await?;
        slot.store(token.clone());
        Ok(token)
    }

    fn slot(&self, host: &str) -> Option<Arc<HostToken>> {
        self.hosts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&host.to_lowercase())
            .cloned()
    }

    fn slot_or_insert(&self, host: &str) -> Arc<HostToken> {
        if let Some(slot) = self.slot(host) {
            return slot;
        }
        self.hosts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(host.to_lowercase())
            .or_default()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn cache() -> TokenCache {
        let auth = Auth::new(
            reqwest::Client::new(),
            Duration::from_secs(1),
            Logger::default(),
        );
        TokenCache::new(auth, Logger::default())
    }

    #[test]
    fn test_empty_cache() {
        assert_eq!(cache().get_cached("ghcr.io"), None);
    }

    #[test]
    fn test_hosts_are_case_insensitive() {
        let cache = cache();
        cache.slot_or_insert("GHCR.io").store("abc".to_string());
        assert_eq!(cache.get_cached("ghcr.io"), Some("abc".to_string()));
        assert_eq!(cache.get_cached("docker.io"), None);
    }

    #[test]
    fn test_store_overwrites() {
        let cache = cache();
        let slot = cache.slot_or_insert("ghcr.io");
        slot.store("first".to_string());
        slot.store("second".to_string());
        assert_eq!(cache.get_cached("ghcr.io"), Some("second".to_string()));
        assert!(Arc::ptr_eq(&slot, &cache.slot_or_insert("ghcr.io")));
    }

    #[tokio::test]
    async fn test_refresh_reuses_token_obtained_while_waiting() {
        let cache = cache();
        let slot = cache.slot_or_insert("ghcr.io");
        let challenge =
            AuthChallenge::parse(r#"Bearer realm="http://127.0.0.1:9/token""#).unwrap();

        // Hold the host lock so the refresh below has to wait, then store a
        // token as a concurrent refresher would.
        let guard = slot.refresh.lock().await;
        let pending = cache.refresh("ghcr.io", &challenge, None);
        tokio::pin!(pending);
        assert!(futures::poll!(pending.as_mut()).is_pending());

        tokio::time::sleep(Duration::from_millis(5)).await;
        slot.store("fresh".to_string());
        drop(guard);

        // The realm is unreachable, so reaching the network would fail.
        assert_eq!(pending.await.unwrap(), "fresh");
    }

    #[tokio::test]
    async fn test_refresh_ignores_token_older_than_request() {
        let cache = cache();
        cache.slot_or_insert("ghcr.io").store("stale".to_string());
        tokio::time::sleep(Duration::from_millis(5)).await;

        let challenge = AuthChallenge::parse(r#"Bearer realm="not a url""#).unwrap();
        let err = cache.refresh("ghcr.io", &challenge, None).await.unwrap_err();
        assert!(matches!(err, crate::error::RegistryError::TokenFetch(_)));
        assert_eq!(cache.get_cached("ghcr.io"), Some("stale".to_string()));
    }

    #[tokio::test]
    async fn test_reads_do_not_wait_on_in_flight_refresh() {
        let cache = Arc::new(cache());
        cache.slot_or_insert("a.example").store("old-a".to_string());
        cache.slot_or_insert("b.example").store("token-b".to_string());

        let slot = cache.slot_or_insert("a.example");
        let guard = slot.refresh.lock().await;
        let challenge =
            AuthChallenge::parse(r#"Bearer realm="http://127.0.0.1:9/token""#).unwrap();
        let pending = cache.refresh("a.example", &challenge, None);
        tokio::pin!(pending);
        assert!(futures::poll!(pending.as_mut()).is_pending());

        let reader = cache.clone();
        let reads = tokio::task::spawn_blocking(move || {
            (reader.get_cached("b.example"), reader.get_cached("a.example"))
        });
        let (b, a) = tokio::time::timeout(Duration::from_secs(1), reads)
            .await
            .expect("cached reads blocked on the refresh lock")
            .unwrap();

        assert_eq!(b, Some("token-b".to_string()));
        assert_eq!(a, Some("old-a".to_string()));
        drop(guard);
    }
}
