//! Key-value access for Redis.

use anyhow::Result;
use async_trait::async_trait;
use redis::AsyncCommands;

/// Minimal store contract: values are strings and every write carries a TTL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Health check - verify connectivity.
    async fn health_check(&self) -> Result<bool>;

    /// Get a value, `None` if it never existed or has expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value that expires after `ttl_secs` (must be at least 1).
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;
}

/// Redis implementation of KvStore.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn health_check(&self) -> Result<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let result: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(result == "PONG")
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // SET with EX 0 is an error in Redis.
        let _: () = conn.set_ex(key, value, ttl_secs.max(1)).await?;
        Ok(())
    }
}
