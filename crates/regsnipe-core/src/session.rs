//! Session artifacts and the per-account session cache.
//!
//! A session artifact is cached proof of authentication (opaque cookies)
//! allowing an attempt to skip the fresh-login sequence. The cache is a
//! pure store: validity (`expires_at` strictly in the future) is the
//! caller's responsibility and is re-checked on every attempt.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::AccountId;

/// One opaque browser cookie captured after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Cookie domain.
    #[serde(default)]
    pub domain: Option<String>,
    /// Cookie path.
    #[serde(default)]
    pub path: Option<String>,
}

impl Cookie {
    /// Create a name/value cookie.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
        }
    }
}

/// The full token set captured from one authenticated automation context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieSet(pub Vec<Cookie>);

impl CookieSet {
    /// Whether the set holds no cookies.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Cached proof of authentication for one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionArtifact {
    /// Opaque token set.
    pub cookies: CookieSet,
    /// Expiry instant. The artifact is reusable only strictly before this.
    pub expires_at: DateTime<Utc>,
}

impl SessionArtifact {
    /// Create an artifact expiring at the given instant.
    pub fn new(cookies: CookieSet, expires_at: DateTime<Utc>) -> Self {
        Self { cookies, expires_at }
    }

    /// Whether the artifact is valid for reuse at `now`.
    ///
    /// Expiry exactly at `now` counts as expired.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Per-account session artifact store.
///
/// At most one live artifact per account; `put` overwrites.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Get the stored artifact for an account, if any.
    async fn get(&self, account: AccountId) -> Option<SessionArtifact>;

    /// Store an artifact, replacing any previous one.
    async fn put(&self, account: AccountId, artifact: SessionArtifact);

    /// Drop the stored artifact for an account.
    async fn invalidate(&self, account: AccountId);
}

/// In-memory session cache.
pub struct MemorySessionCache {
    artifacts: RwLock<HashMap<AccountId, SessionArtifact>>,
}

impl MemorySessionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            artifacts: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemorySessionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn get(&self, account: AccountId) -> Option<SessionArtifact> {
        let artifacts = self.artifacts.read().await;
        artifacts.get(&account).cloned()
    }

    async fn put(&self, account: AccountId, artifact: SessionArtifact) {
        let mut artifacts = self.artifacts.write().await;
        artifacts.insert(account, artifact);
    }

    async fn invalidate(&self, account: AccountId) {
        let mut artifacts = self.artifacts.write().await;
        artifacts.remove(&account);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn artifact(expires_at: DateTime<Utc>) -> SessionArtifact {
        SessionArtifact::new(CookieSet(vec![Cookie::new("JSESSIONID", "abc")]), expires_at)
    }

    #[test]
    fn test_validity_is_strictly_future() {
        let now = Utc::now();
        assert!(artifact(now + chrono::Duration::hours(1)).is_valid_at(now));
        assert!(!artifact(now).is_valid_at(now));
        assert!(!artifact(now - chrono::Duration::seconds(1)).is_valid_at(now));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let cache = MemorySessionCache::new();
        let account = Uuid::new_v4();
        let now = Utc::now();

        cache.put(account, artifact(now + chrono::Duration::hours(1))).await;
        cache.put(account, artifact(now + chrono::Duration::hours(24))).await;

        let stored = cache.get(account).await.unwrap();
        assert_eq!(stored.expires_at, now + chrono::Duration::hours(24));
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = MemorySessionCache::new();
        let account = Uuid::new_v4();

        cache.put(account, artifact(Utc::now() + chrono::Duration::hours(1))).await;
        cache.invalidate(account).await;
        assert!(cache.get(account).await.is_none());
    }
}
