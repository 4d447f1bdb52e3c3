//! The KV backend contract behind the idempotency store and rate
//! limiter: `get`, `set` (with a TTL), and `ping`. [`MemoryKv`] is the
//! in-process backend used for local development and the test suite;
//! [`UpstashKv`] talks to an Upstash Redis REST endpoint when
//! `UPSTASH_REDIS_REST_URL`/`UPSTASH_REDIS_REST_TOKEN` are configured.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("kv backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), KvError>;
    async fn ping(&self) -> Result<(), KvError>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// An in-process KV store. Entries older than their TTL are treated as
/// absent on read and swept opportunistically on write, mirroring the
/// bounded in-memory caches used elsewhere in this crate.
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        MemoryKv {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), KvError> {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() > 10_000 {
            let now = Instant::now();
            entries.retain(|_, v| v.expires_at > now);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + Duration::from_secs(ttl_secs.max(1)),
            },
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), KvError> {
        Ok(())
    }
}

/// Upstash Redis REST API backend. Uses the `GET /get/<key>` and
/// `POST /set/<key>` (with `EX` query param) shapes of Upstash's REST
/// surface; any non-2xx/4xx response, or a connection failure, surfaces as
/// [`KvError::Unavailable`] so callers can apply the fail-open/fail-closed
/// rules the idempotency store and rate limiter apply on backend failure.
pub struct UpstashKv {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl UpstashKv {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        UpstashKv {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl KvStore for UpstashKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let url = format!("{}/get/{}", self.base_url, urlencode(key));
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| KvError::Unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(KvError::Unavailable(format!("status {}", resp.status())));
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| KvError::Unavailable(e.to_string()))?;
        Ok(body.get("result").and_then(|v| v.as_str()).map(|s| s.to_string()))
    }

    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), KvError> {
        let url = format!(
            "{}/set/{}/{}?EX={}",
            self.base_url,
            urlencode(key),
            urlencode(&value),
            ttl_secs.max(1)
        );
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| KvError::Unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(KvError::Unavailable(format!("status {}", resp.status())));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), KvError> {
        let resp = self
            .client
            .get(&self.base_url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| KvError::Unavailable(e.to_string()))?;
        if resp.status().is_server_error() {
            return Err(KvError::Unavailable(format!("status {}", resp.status())));
        }
        Ok(())
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
