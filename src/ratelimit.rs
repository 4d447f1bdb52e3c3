//! Sliding-window rate limiter, per-identifier (typically
//! client IP) over a [`crate::kv::KvStore`] backend.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::kv::KvStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_epoch_sec: u64,
    pub retry_after_sec: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Window {
    /// Epoch-second timestamps of requests observed within the current
    /// window; pruned of anything older than `window_secs` on each check.
    hits: Vec<u64>,
}

pub struct RateLimiter {
    kv: Arc<dyn KvStore>,
    limit: u32,
    window_secs: u64,
    env: String,
}

impl RateLimiter {
    pub fn new(kv: Arc<dyn KvStore>, limit: u32, window_secs: u64, env: impl Into<String>) -> Self {
        RateLimiter { kv, limit, window_secs, env: env.into() }
    }

    fn key(&self, identifier: &str) -> String {
        format!("PAYPLAN:{}:rl:{identifier}", self.env)
    }

    fn now() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
    }

    /// Check and record one request from `identifier`. Fails open (allows
    /// the request) if the backend is unavailable.
    pub async fn check(&self, identifier: &str) -> RateLimitDecision {
        let key = self.key(identifier);
        let now = Self::now();
        let window_start = now.saturating_sub(self.window_secs);

        let mut window = match self.kv.get(&key).await {
            Ok(Some(raw)) => serde_json::from_str::<Window>(&raw).unwrap_or_default(),
            Ok(None) => Window::default(),
            Err(_) => {
                return RateLimitDecision {
                    allowed: true,
                    limit: self.limit,
                    remaining: self.limit,
                    reset_epoch_sec: now + self.window_secs,
                    retry_after_sec: None,
                };
            }
        };

        window.hits.retain(|&t| t > window_start);
        let reset_epoch_sec = window.hits.first().copied().unwrap_or(now) + self.window_secs;

        if window.hits.len() as u32 >= self.limit {
            return RateLimitDecision {
                allowed: false,
                limit: self.limit,
                remaining: 0,
                reset_epoch_sec,
                retry_after_sec: Some(reset_epoch_sec.saturating_sub(now).max(1)),
            };
        }

        window.hits.push(now);
        let remaining = self.limit - window.hits.len() as u32;
        if let Ok(serialized) = serde_json::to_string(&window) {
            let _ = self.kv.set(&key, serialized, self.window_secs).await;
        }

        RateLimitDecision {
            allowed: true,
            limit: self.limit,
            remaining,
            reset_epoch_sec,
            retry_after_sec: None,
        }
    }
}
