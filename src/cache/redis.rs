//! Redis cache implementation
//!
//! Shared cache for multi-instance deployments. Every key is stored under
//! the `agora:` namespace so `clear` and pattern deletes never touch keys
//! owned by other applications on the same database.
//!
//! - TTL via SETEX
//! - Pattern deletion via SCAN + DEL (not KEYS, which blocks the server)

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Default TTL for cache entries (1 hour)
const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Number of keys to scan per iteration in delete_pattern
const SCAN_COUNT: usize = 100;

const NAMESPACE: &str = "agora:";

/// Redis cache implementation
pub struct RedisCache {
    connection: MultiplexedConnection,
    default_ttl: Duration,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Connect with the default one-hour TTL
    pub async fn new(redis_url: &str) -> Result<Self> {
        Self::with_ttl(redis_url, DEFAULT_TTL).await
    }

    /// Connect with a custom default TTL
    pub async fn with_ttl(redis_url: &str, default_ttl: Duration) -> Result<Self> {
        let client = Client::open(redis_url).context("Failed to create Redis client")?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self {
            connection,
            default_ttl,
        })
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn namespaced(key: &str) -> String {
        format!("{}{}", NAMESPACE, key)
    }

    async fn delete_matching(&self, redis_pattern: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let mut cursor: u64 = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(redis_pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .context("Failed to scan keys in Redis")?;

            if !keys.is_empty() {
                let _: () = conn
                    .del(&keys)
                    .await
                    .context("Failed to delete keys from Redis")?;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl CacheLayer for RedisCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.connection.clone();

        let result: Option<String> = conn
            .get(Self::namespaced(key))
            .await
            .context("Failed to get value from Redis")?;

        match result {
            Some(json) => {
                let value =
                    serde_json::from_str(&json).context("Failed to deserialize cached value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;

        let ttl = if ttl.is_zero() { self.default_ttl } else { ttl };
        // SETEX takes whole seconds
        let ttl_secs = ttl.as_secs().max(1);

        let _: () = conn
            .set_ex(Self::namespaced(key), json, ttl_secs)
            .await
            .context("Failed to set value in Redis")?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();

        let _: () = conn
            .del(Self::namespaced(key))
            .await
            .context("Failed to delete key from Redis")?;

        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        self.delete_matching(&Self::namespaced(pattern)).await
    }

    async fn clear(&self) -> Result<()> {
        self.delete_matching(&Self::namespaced("*")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
    }

    #[test]
    fn test_keys_are_namespaced() {
        assert_eq!(RedisCache::namespaced("article-1/show"), "agora:article-1/show");
        assert_eq!(RedisCache::namespaced("feed:*"), "agora:feed:*");
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn test_set_get_delete() {
        let cache = RedisCache::new(&get_redis_url()).await.unwrap();

        cache
            .set("test:key1", &"value1".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        let result: Option<String> = cache.get("test:key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));

        cache.delete("test:key1").await.unwrap();
        let result: Option<String> = cache.get("test:key1").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn test_delete_pattern() {
        let cache = RedisCache::new(&get_redis_url()).await.unwrap();
        let ttl = Duration::from_secs(60);

        cache.set("user-77/profile", &"p".to_string(), ttl).await.unwrap();
        cache.set("user-77/ada", &"a".to_string(), ttl).await.unwrap();
        cache.set("user-778/profile", &"x".to_string(), ttl).await.unwrap();

        cache.delete_pattern("user-77/*").await.unwrap();

        assert_eq!(cache.get::<String>("user-77/profile").await.unwrap(), None);
        assert_eq!(cache.get::<String>("user-77/ada").await.unwrap(), None);
        assert!(cache.get::<String>("user-778/profile").await.unwrap().is_some());

        cache.delete("user-778/profile").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn test_ttl_expiration() {
        let cache = RedisCache::new(&get_redis_url()).await.unwrap();

        cache
            .set("test:ttl_key", &"value".to_string(), Duration::from_secs(1))
            .await
            .unwrap();
        let result: Option<String> = cache.get("test:ttl_key").await.unwrap();
        assert_eq!(result, Some("value".to_string()));

        tokio::time::sleep(Duration::from_secs(2)).await;

        let result: Option<String> = cache.get("test:ttl_key").await.unwrap();
        assert_eq!(result, None);
    }
}
