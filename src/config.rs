//! Environment-driven configuration.
//!
//! Every variable is optional; unset variables take the documented default.
//! A variable that *is* set but fails to parse is a startup-time error —
//! failing fast beats silently ignoring a typo'd `RATE_LIMIT_PER_HOUR`.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::kv::{KvStore, MemoryKv, UpstashKv};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub rate_limit_per_hour: u32,
    pub idempotency_ttl_secs: u64,
    pub cors_origin: String,
    pub env: String,
    pub log_format: LogFormat,
    pub bind_addr: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Ok(Settings {
            rate_limit_per_hour: parse_env("RATE_LIMIT_PER_HOUR", 60)?,
            idempotency_ttl_secs: parse_env("IDEMPOTENCY_TTL_SECONDS", 86_400)?,
            cors_origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            env: env::var("PAYPLAN_ENV").unwrap_or_else(|_| "dev".to_string()),
            log_format: match env::var("PAYPLAN_LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            bind_addr: env::var("PAYPLAN_BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
        })
    }

    /// Build the KV backend this process should use: Upstash when both
    /// credentials are present, otherwise an in-process store.
    pub fn build_kv(&self) -> Arc<dyn KvStore> {
        match (
            env::var("UPSTASH_REDIS_REST_URL"),
            env::var("UPSTASH_REDIS_REST_TOKEN"),
        ) {
            (Ok(url), Ok(token)) if !url.is_empty() && !token.is_empty() => {
                Arc::new(UpstashKv::new(url, token))
            }
            _ => Arc::new(MemoryKv::new()),
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("failed to parse {name}=\"{raw}\"")),
        Err(_) => Ok(default),
    }
}
