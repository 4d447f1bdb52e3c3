//! Idempotency store: keyed cache over a [`crate::kv::KvStore`]
//! backend with hit/miss/conflict semantics.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::canonical_hash;
use crate::kv::KvStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub body_hash: String,
    pub response: Value,
    pub timestamp_ms: i64,
    pub ttl_ms: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Miss,
    Hit(Value),
    Conflict,
}

pub struct IdempotencyStore {
    kv: Arc<dyn KvStore>,
    ttl_secs: u64,
}

impl IdempotencyStore {
    pub fn new(kv: Arc<dyn KvStore>, ttl_secs: u64) -> Self {
        IdempotencyStore { kv, ttl_secs }
    }

    fn key(method: &str, path: &str, idempotency_key: &str) -> String {
        format!("idem:{method}:{path}:{idempotency_key}")
    }

    /// Hash the request body for comparison against a stored record.
    pub fn hash_body(body: &Value) -> String {
        canonical_hash(body)
    }

    /// Look up a cached response for `(method, path, idempotency_key)`.
    ///
    /// Fails open (returns `Miss`) when the KV backend is unavailable, per
    /// A record that fails schema validation on read is a
    /// `CacheValidation` error instead — fail-closed for that operation
    /// only, since serving a malformed cached response is worse than an
    /// extra compute.
    pub async fn lookup(
        &self,
        method: &str,
        path: &str,
        idempotency_key: &str,
        body_hash: &str,
    ) -> Result<LookupOutcome, crate::error::PayPlanError> {
        let key = Self::key(method, path, idempotency_key);
        let raw = match self.kv.get(&key).await {
            Ok(raw) => raw,
            Err(_) => return Ok(LookupOutcome::Miss),
        };
        let Some(raw) = raw else {
            return Ok(LookupOutcome::Miss);
        };
        let record: IdempotencyRecord = serde_json::from_str(&raw).map_err(|e| {
            crate::error::PayPlanError::CacheValidation(format!(
                "stored idempotency record failed validation: {e}"
            ))
        })?;
        if record.body_hash == body_hash {
            Ok(LookupOutcome::Hit(record.response))
        } else {
            Ok(LookupOutcome::Conflict)
        }
    }

    /// Store a successful response. Store failures never block the
    /// response already computed for the client.
    pub async fn store(&self, method: &str, path: &str, idempotency_key: &str, body_hash: &str, response: &Value) {
        let key = Self::key(method, path, idempotency_key);
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        let record = IdempotencyRecord {
            body_hash: body_hash.to_string(),
            response: response.clone(),
            timestamp_ms,
            ttl_ms: (self.ttl_secs as i64) * 1000,
        };
        let Ok(serialized) = serde_json::to_string(&record) else {
            tracing::warn!("failed to serialize idempotency record; skipping store");
            return;
        };
        if let Err(e) = self.kv.set(&key, serialized, self.ttl_secs).await {
            tracing::warn!(error = %e, "idempotency store write failed; continuing without caching");
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }
}
