use std::time::Duration;

use anyhow::Context;

use chrono::Utc;

use redis::aio::ConnectionManager;

use uuid::Uuid;

use super::{MemoryRateLimiter, RateLimitDecision, RateLimiter};

/// Sliding-window rate limiter over a Redis sorted set per key.
/// Shared across instances; on any backend failure the check fails OPEN to
/// an embedded in-memory limiter so the limiter itself never errors.
pub struct RedisRateLimiter {
    conn: ConnectionManager,
    window: Duration,
    max_requests: u32,
    fallback: MemoryRateLimiter,
}

impl RedisRateLimiter {
    pub async fn connect(url: &str, window: Duration, max_requests: u32) -> anyhow::Result<Self> {
        let client = redis::Client::open(url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        tracing::info!("Connected to Redis rate-limit backend");

        Ok(Self {
            conn,
            window,
            max_requests,
            fallback: MemoryRateLimiter::new(window, max_requests),
        })
    }

    async fn try_limit(&self, key: &str) -> redis::RedisResult<RateLimitDecision> {
        let now_ms = Utc::now().timestamp_millis();
        let window_ms = self.window.as_millis() as i64;
        let cutoff = now_ms - window_ms;

        let bucket = format!("leadflow:rate:{}", key);
        let member = format!("{}-{}", now_ms, Uuid::new_v4());

        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.cmd("ZREMRANGEBYSCORE").arg(&bucket).arg(0).arg(cutoff).ignore();
        pipe.cmd("ZADD").arg(&bucket).arg(now_ms).arg(&member).ignore();
        pipe.cmd("ZCARD").arg(&bucket);
        pipe.cmd("EXPIRE")
            .arg(&bucket)
            .arg(self.window.as_secs() + 1)
            .ignore();

        let (count,): (u32,) = pipe.query_async(&mut conn).await?;

        Ok(RateLimitDecision {
            success: count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(count),
            reset: (now_ms + window_ms) / 1000,
        })
    }
}

#[async_trait::async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn limit(&self, key: &str) -> RateLimitDecision {
        match self.try_limit(key).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(
                    "Rate-limit backend unreachable, failing open to in-process counter: {}",
                    e
                );
                self.fallback.limit(key).await
            }
        }
    }
}
