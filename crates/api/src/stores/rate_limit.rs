//! Fixed-window rate limiting for verification requests.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::KvStore;

/// Length of one counting window. Windows are calendar minutes.
pub const RATE_WINDOW_SECS: u64 = 60;

/// Key of the counter for `client_ip` in the window containing `now`.
pub fn rate_limit_key(client_ip: &str, now: DateTime<Utc>) -> String {
    let bucket = now
        .timestamp_millis()
        .div_euclid(RATE_WINDOW_SECS as i64 * 1000);
    format!("rl:ip:{}:{}", client_ip, bucket)
}

/// Rate limiter trait for checking and counting a client's requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request from `client_ip` in the window containing `now`.
    /// At most `limit` requests per window are allowed.
    async fn check_window(
        &self,
        client_ip: &str,
        limit: u64,
        now: DateTime<Utc>,
    ) -> Result<RateLimitResult>;
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Under the limit, includes the count including this request.
    Allowed(u64),
    /// Over the limit, includes the count already recorded.
    Exceeded(u64),
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_))
    }
}

/// Read-then-write limiter for stores without an atomic increment.
///
/// The read and the write are separate store calls, so concurrent requests
/// in the same window can read the same count and both be admitted. The
/// overshoot is bounded by the number of requests racing in that window.
#[derive(Clone)]
pub struct WindowRateLimiter {
    store: Arc<dyn KvStore>,
}

impl WindowRateLimiter {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RateLimiter for WindowRateLimiter {
    async fn check_window(
        &self,
        client_ip: &str,
        limit: u64,
        now: DateTime<Utc>,
    ) -> Result<RateLimitResult> {
        let key = rate_limit_key(client_ip, now);

        let count = match self.store.get(&key).await? {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(key = %key, value = %raw, "unreadable rate counter, treating as 0");
                0
            }),
            None => 0,
        };

        if count >= limit {
            return Ok(RateLimitResult::Exceeded(count));
        }

        let count = count + 1;
        self.store
            .set_ex(&key, &count.to_string(), RATE_WINDOW_SECS)
            .await?;

        Ok(RateLimitResult::Allowed(count))
    }
}

/// Redis implementation of RateLimiter using atomic `INCR`.
#[derive(Clone)]
pub struct RedisRateLimiter {
    client: redis::Client,
}

impl RedisRateLimiter {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check_window(
        &self,
        client_ip: &str,
        limit: u64,
        now: DateTime<Utc>,
    ) -> Result<RateLimitResult> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = rate_limit_key(client_ip, now);

        let count: u64 = redis::cmd("INCR").arg(&key).query_async(&mut conn).await?;

        if count == 1 {
            let _: () = redis::cmd("EXPIRE")
                .arg(&key)
                .arg(RATE_WINDOW_SECS)
                .query_async(&mut conn)
                .await?;
        }

        if count > limit {
            Ok(RateLimitResult::Exceeded(count - 1))
        } else {
            Ok(RateLimitResult::Allowed(count))
        }
    }
}
