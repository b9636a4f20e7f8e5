mod memory;
mod redis;

pub use self::memory::MemoryRateLimiter;
pub use self::redis::RedisRateLimiter;

use actix_web::HttpResponseBuilder;

/// Outcome of one rate-limit check. `reset` is the unix timestamp at which
/// the current window frees up, surfaced so clients can back off correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub success: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset: i64,
}

impl RateLimitDecision {
    /// Attach the standard rate-limit metadata headers to a response
    pub fn apply_headers(&self, builder: &mut HttpResponseBuilder) {
        builder.insert_header(("X-RateLimit-Limit", self.limit.to_string()));
        builder.insert_header(("X-RateLimit-Remaining", self.remaining.to_string()));
        builder.insert_header(("X-RateLimit-Reset", self.reset.to_string()));
    }
}

/// Caps lead-related request rates per client identity over a sliding window.
/// Checks never fail: an unreachable counter backend degrades to an
/// in-process approximation rather than surfacing an error.
#[async_trait::async_trait]
pub trait RateLimiter: Send + Sync {
    async fn limit(&self, key: &str) -> RateLimitDecision;
}
