//! Redis-backed resolution cache
//!
//! Shares host lookups between every API instance. Entries are JSON encoded
//! under `site:{host}` and expire with `SETEX`.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

use super::cache::{CachedSite, ResolutionCache};

const KEY_PREFIX: &str = "site:";

/// Resolution cache stored in Redis
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisCache {
    /// Connect to Redis with a custom TTL
    pub async fn connect_with_ttl(redis_url: &str, ttl: Duration) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn, ttl })
    }

    fn key(host: &str) -> String {
        format!("{KEY_PREFIX}{host}")
    }

    fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs().max(1)
    }
}

#[async_trait]
impl ResolutionCache for RedisCache {
    async fn get(&self, host: &str) -> Option<CachedSite> {
        let mut conn = self.conn.clone();
        let raw = match conn.get::<_, Option<String>>(Self::key(host)).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(host = %host, error = %e, "Site cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw?) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(host = %host, error = %e, "Discarding undecodable site cache entry");
                None
            }
        }
    }

    async fn set(&self, host: &str, entry: CachedSite) {
        let value = match serde_json::to_string(&entry) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(host = %host, error = %e, "Failed to encode site cache entry");
                return;
            }
        };

        let mut conn = self.conn.clone();
        if let Err(e) = conn
            .set_ex::<_, _, ()>(Self::key(host), value, self.ttl_secs())
            .await
        {
            tracing::warn!(host = %host, error = %e, "Site cache write failed");
        }
    }

    async fn invalidate(&self, host: &str) {
        let mut conn = self.conn.clone();
        if let Err(e) = conn.del::<_, ()>(Self::key(host)).await {
            tracing::warn!(host = %host, error = %e, "Site cache invalidation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multihost_shared::Site;

    #[test]
    fn test_key_prefix() {
        assert_eq!(RedisCache::key("shop.test:443"), "site:shop.test:443");
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_redis_round_trip() {
        let url = std::env::var("REDIS_URL").expect("REDIS_URL required");
        let cache = RedisCache::connect_with_ttl(&url, Duration::from_secs(5))
            .await
            .expect("Failed to connect to Redis");

        let host = "redis-cache-test.invalid";
        cache.invalidate(host).await;
        assert!(cache.get(host).await.is_none());

        let site = Site::new(5, host);
        cache.set(host, CachedSite::Found(site.clone())).await;
        assert_eq!(cache.get(host).await, Some(CachedSite::Found(site)));

        cache.set(host, CachedSite::Missing).await;
        assert_eq!(cache.get(host).await, Some(CachedSite::Missing));

        cache.invalidate(host).await;
        assert!(cache.get(host).await.is_none());
    }
}
