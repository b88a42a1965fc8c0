//! Session cache: email → most recently issued session token.
//!
//! Only a best-effort short-circuit for duplicate registration. Authorization
//! never consults it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::CacheError;

/// Trait for session cache backends.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Returns the cached token for `email`, if present and unexpired.
    async fn get(&self, email: &str) -> Result<Option<String>, CacheError>;

    /// Caches `token` for `email`, expiring after `ttl`.
    async fn set_with_ttl(&self, email: &str, token: &str, ttl: Duration)
    -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    token: String,
    /// `None` when the TTL runs past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// In-memory session cache with lazy expiry.
#[derive(Debug, Default)]
pub struct InMemorySessionCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl InMemorySessionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn get(&self, email: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().await;
        match entries.get(email) {
            Some(entry) if entry.is_live(Instant::now()) => Ok(Some(entry.token.clone())),
            Some(_) => {
                entries.remove(email);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(
        &self,
        email: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.entries.lock().await.insert(
            email.to_string(),
            CacheEntry {
                token: token.to_string(),
                expires_at: Instant::now().checked_add(ttl),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_cached_token() {
        let cache = InMemorySessionCache::new();
        cache
            .set_with_ttl("a@x.com", "t1", Duration::from_secs(60))
            .await
            .expect("set");

        assert_eq!(cache.get("a@x.com").await, Ok(Some("t1".to_string())));
        assert_eq!(cache.get("b@x.com").await, Ok(None));
    }

    #[tokio::test]
    async fn expired_entry_is_absent() {
        let cache = InMemorySessionCache::new();
        cache
            .set_with_ttl("a@x.com", "t1", Duration::ZERO)
            .await
            .expect("set");

        assert_eq!(cache.get("a@x.com").await, Ok(None));
    }

    #[tokio::test]
    async fn unrepresentable_ttl_never_expires() {
        let cache = InMemorySessionCache::new();
        cache
            .set_with_ttl("a@x.com", "t1", Duration::MAX)
            .await
            .expect("set");

        assert_eq!(cache.get("a@x.com").await, Ok(Some("t1".to_string())));
    }

    #[tokio::test]
    async fn set_overwrites() {
        let cache = InMemorySessionCache::new();
        let ttl = Duration::from_secs(60);
        cache.set_with_ttl("a@x.com", "t1", ttl).await.expect("set");
        cache.set_with_ttl("a@x.com", "t2", ttl).await.expect("set");

        assert_eq!(cache.get("a@x.com").await, Ok(Some("t2".to_string())));
    }
}
