//! Canonical JSON form and SHA-256 hashing, used solely by the
//! idempotency store — never persisted as output.
//!
//! `serde_json::Value`'s default `Object` representation (no
//! `preserve_order` feature) is backed by a `BTreeMap`, so object keys are
//! already in sorted order the moment a value is parsed or constructed.
//! Canonicalization therefore reduces to: serialize with `serde_json`,
//! which walks that already-sorted tree and preserves array order as-is.
//! We still expose an explicit `canonicalize` step (rather than hashing
//! `to_string` output directly) so the hashed representation is documented
//! and can't silently drift if a `preserve_order`-enabled dependency is ever
//! introduced elsewhere in the dependency graph.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Recursively rebuild `value` so that every nested object's keys are in
/// ascending sorted order. Arrays keep their original element order;
/// primitives are left untouched.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(String, Value)> = map
                .iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Serialize the canonical form to a compact JSON string.
pub fn canonical_string(value: &Value) -> String {
    serde_json::to_string(&canonicalize(value)).expect("canonical JSON values always serialize")
}

/// Hex-encoded SHA-256 digest of a string.
pub fn sha256_hex(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Convenience: canonicalize then hash in one step.
pub fn canonical_hash(value: &Value) -> String {
    sha256_hex(&canonical_string(value))
}
