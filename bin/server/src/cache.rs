//! Redis-backed session cache.
//!
//! Keys are `session:<email>`; values are the issued session token, stored
//! with `SET EX` for the token's validity window.

use async_trait::async_trait;
use nowplaying_identity::{CacheError, SessionCache};
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::time::Duration;
use tracing::{info, instrument};

/// Session cache using Redis `ConnectionManager` for automatic reconnection.
#[derive(Clone)]
pub struct RedisSessionCache {
    manager: ConnectionManager,
    timeout: Duration,
}

impl RedisSessionCache {
    /// Connects to Redis.
    ///
    /// `timeout` bounds the initial connection and every later command.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Unavailable` if the URL is invalid or Redis
    /// cannot be reached.
    pub async fn connect(redis_url: &str, timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url).map_err(|e| CacheError::Unavailable {
            reason: format!("invalid Redis URL: {e}"),
        })?;

        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(timeout)
            .set_response_timeout(timeout);
        let manager = ConnectionManager::new_with_config(client, config)
            .await
            .map_err(|e| CacheError::Unavailable {
                reason: format!("failed to connect to Redis: {e}"),
            })?;

        info!("connected to Redis");
        Ok(Self { manager, timeout })
    }
}

fn cache_key(email: &str) -> String {
    format!("session:{email}")
}

/// Redis rejects `SET EX 0`; anything shorter than a second is rounded up.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

fn unavailable(operation: &str, error: impl std::fmt::Display) -> CacheError {
    CacheError::Unavailable {
        reason: format!("Redis {operation} failed: {error}"),
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    #[instrument(skip_all)]
    async fn get(&self, email: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.manager.clone();
        tokio::time::timeout(self.timeout, conn.get::<_, Option<String>>(cache_key(email)))
            .await
            .map_err(|e| unavailable("GET", e))?
            .map_err(|e| unavailable("GET", e))
    }

    #[instrument(skip_all)]
    async fn set_with_ttl(
        &self,
        email: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        tokio::time::timeout(
            self.timeout,
            conn.set_ex::<_, _, ()>(cache_key(email), token, ttl_seconds(ttl)),
        )
        .await
        .map_err(|e| unavailable("SET", e))?
        .map_err(|e| unavailable("SET", e))
    }
}

impl std::fmt::Debug for RedisSessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionCache")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_email() {
        assert_eq!(cache_key("a@x.com"), "session:a@x.com");
    }

    #[test]
    fn ttl_is_at_least_one_second() {
        assert_eq!(ttl_seconds(Duration::from_secs(3600)), 3600);
        assert_eq!(ttl_seconds(Duration::from_millis(200)), 1);
        assert_eq!(ttl_seconds(Duration::ZERO), 1);
    }

    #[tokio::test]
    async fn invalid_url_is_unavailable() {
        let err = RedisSessionCache::connect("not-a-redis-url", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Unavailable { .. }));
    }
}
