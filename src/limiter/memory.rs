use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{RateLimitDecision, RateLimiter};

/// Sliding-window rate limiter over an in-process map of per-key hit
/// timestamps. Weaker than the networked counter under multi-instance
/// deployment: each process counts only its own traffic.
#[derive(Debug)]
pub struct MemoryRateLimiter {
    window: chrono::Duration,
    max_requests: u32,
    hits: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl MemoryRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        let window = chrono::Duration::from_std(window).expect("rate-limit window out of range");

        Self {
            window,
            max_requests,
            hits: Mutex::new(HashMap::new()),
        }
    }

    fn decide(&self, key: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let cutoff = now - self.window;

        let mut hits = self.hits.lock().expect("rate limiter lock poisoned");
        hits.retain(|_, timestamps| timestamps.iter().any(|t| *t > cutoff));

        let entry = hits.entry(key.to_string()).or_default();
        entry.retain(|t| *t > cutoff);

        let success = (entry.len() as u32) < self.max_requests;
        if success {
            entry.push(now);
        }

        let reset = (entry.first().copied().unwrap_or(now) + self.window).timestamp();
        let remaining = self.max_requests.saturating_sub(entry.len() as u32);

        RateLimitDecision {
            success,
            limit: self.max_requests,
            remaining,
            reset,
        }
    }
}

#[async_trait::async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn limit(&self, key: &str) -> RateLimitDecision {
        self.decide(key, Utc::now())
    }
}
