//! Recursive, field-name-based PII redaction.
//!
//! `serde_json::Value` is an owned tree — unlike the JS object graphs this
//! component is modeled on, it cannot contain a true reference cycle (JSON
//! text is syntactically acyclic, and `serde_json` has no way to produce a
//! back-edge while parsing it). The practical equivalent carried over here
//! is a recursion-depth guard: past [`MAX_DEPTH`], the remainder of a
//! subtree is replaced with the same `"[Circular]"` sentinel the original
//! cycle detector would have used. `Date`/`RegExp`/`Map`/`Set` special
//! casing from the JS original has no counterpart either, since
//! `serde_json::Value` has no variants for those types — any value that
//! would hit those branches is already a `String`, `Array`, or `Object` by
//! the time it reaches us.

use std::borrow::Cow;
use std::sync::Mutex;

use lru::LruCache;
use regex::Regex;
use serde_json::{Map, Value};
use std::num::NonZeroUsize;
use std::sync::OnceLock;

const MAX_DEPTH: usize = 64;
const FIELD_CACHE_SIZE: usize = 4096;

const AUTH_TIER: &[&str] = &[
    "password",
    "passwd",
    "token",
    "bearer",
    "apikey",
    "api_key",
    "accesskey",
    "access_key",
    "secret",
    "auth",
    "credential",
    "credentials",
    "authorization",
];

const PII_TIER: &[&str] = &[
    "email",
    "phone",
    "address",
    "name",
    "ssn",
    "dob",
    "birthdate",
    "dateofbirth",
    "passport",
    "license",
    "driverslicense",
    "nationalid",
    "card",
    "cardnumber",
    "pan",
    "cvv",
    "cvc",
    "expiry",
    "account",
    "bankaccount",
    "routing",
    "iban",
    "swift",
    "tin",
    "taxid",
    "vat",
    "ip",
    "ipaddress",
];

const PROTOTYPE_POLLUTION_KEYS: &[&str] = &["__proto__", "constructor", "prototype"];

/// A tier's matcher is split in two because the forms need different case
/// handling: exact/snake forms should fold case (so `"PASSWORD"` and
/// `"password"` match equally), but the camel/prefix forms *depend on* case
/// to detect the lower-to-upper transition that signals a word boundary —
/// folding case first would destroy that signal. ASCII-only folding throughout
/// (never Unicode) is deliberate: a Cyrillic look-alike character must
/// not be treated as a match.
struct TierMatcher {
    /// Exact and snake_case forms, matched against the ASCII-lowercased field.
    folded: Regex,
    /// camelCase (and, for the auth tier, bare prefix) forms, matched
    /// against the field's original casing.
    cased: Regex,
}

impl TierMatcher {
    fn is_match(&self, field: &str, lower: &str) -> bool {
        self.folded.is_match(lower) || self.cased.is_match(field)
    }
}

fn build_tier_matcher(words: &[&str], conservative: bool) -> TierMatcher {
    // Rust's `regex` crate has no lookaround (that's what buys it the
    // linear-time, ReDoS-safe guarantee this crate wants), so forms the
    // original design expressed with a lookahead are instead written as an
    // explicit alternation between "followed by a boundary char" and
    // "followed by end of string" — equivalent for a whole-field `is_match`
    // test, since we never need the boundary character left unconsumed:
    //   exact:  ^word\d*$
    //   snake:  (?:^|_)word\d*(?:_|$)
    //   camel:  [a-z]Word(?:[A-Z0-9_]|$)
    // The aggressive (auth) tier additionally allows a bare prefix match:
    //   ^word(?:[A-Z0-9_])
    let mut folded_alts: Vec<String> = Vec::new();
    let mut cased_alts: Vec<String> = Vec::new();
    for w in words {
        let cap = format!("{}{}", w[..1].to_uppercase(), &w[1..]);
        folded_alts.push(format!(r"^{w}\d*$"));
        folded_alts.push(format!(r"(?:^|_){w}\d*(?:_|$)"));
        cased_alts.push(format!(r"[a-z]{cap}(?:[A-Z0-9_]|$)"));
        if !conservative {
            cased_alts.push(format!(r"^{w}(?:[A-Z0-9_])"));
        }
    }
    TierMatcher {
        folded: Regex::new(&format!("(?:{})", folded_alts.join("|")))
            .expect("folded tier regex always compiles"),
        cased: Regex::new(&format!("(?:{})", cased_alts.join("|")))
            .expect("cased tier regex always compiles"),
    }
}

static AUTH_RE: OnceLock<TierMatcher> = OnceLock::new();
static PII_RE: OnceLock<TierMatcher> = OnceLock::new();
static FIELD_CACHE: OnceLock<Mutex<LruCache<String, (bool, bool)>>> = OnceLock::new();

fn auth_re() -> &'static TierMatcher {
    AUTH_RE.get_or_init(|| build_tier_matcher(AUTH_TIER, false))
}

fn pii_re() -> &'static TierMatcher {
    PII_RE.get_or_init(|| build_tier_matcher(PII_TIER, true))
}

fn field_cache() -> &'static Mutex<LruCache<String, (bool, bool)>> {
    FIELD_CACHE.get_or_init(|| {
        Mutex::new(LruCache::new(NonZeroUsize::new(FIELD_CACHE_SIZE).unwrap()))
    })
}

/// `true` if `field` matches the aggressive auth-secret tier. ASCII-only
/// case folding by design: Unicode look-alikes (e.g. a Cyrillic "а" in
/// place of Latin "a") are *not* treated as a match.
pub fn is_auth_field(field: &str) -> bool {
    classify(field).0
}

/// `true` if `field` matches the conservative PII tier.
pub fn is_pii_field(field: &str) -> bool {
    classify(field).1
}

fn classify(field: &str) -> (bool, bool) {
    {
        let mut cache = field_cache().lock().unwrap();
        if let Some(hit) = cache.get(field) {
            return *hit;
        }
    }
    let lower = field.to_ascii_lowercase();
    let result = (
        auth_re().is_match(field, &lower),
        pii_re().is_match(field, &lower),
    );
    field_cache().lock().unwrap().put(field.to_string(), result);
    result
}

fn is_sensitive_key(key: &str) -> bool {
    is_auth_field(key) || is_pii_field(key)
}

/// Sanitize a JSON value for safe logging. Returns `Cow::Borrowed` (the same
/// reference) when nothing needed to change — the Rust analogue of the
/// original's structural-sharing guarantee, since `Value` has no shared
/// reference type to return verbatim otherwise.
pub fn sanitize(value: &Value) -> Cow<'_, Value> {
    sanitize_at_depth(value, 0)
}

fn sanitize_at_depth(value: &Value, depth: usize) -> Cow<'_, Value> {
    if depth >= MAX_DEPTH {
        return Cow::Owned(Value::String("[Circular]".to_string()));
    }
    match value {
        Value::Object(map) => {
            let mut changed = false;
            let mut out = Map::with_capacity(map.len());
            for (key, val) in map {
                if PROTOTYPE_POLLUTION_KEYS.contains(&key.as_str()) || is_sensitive_key(key) {
                    changed = true;
                    continue;
                }
                match sanitize_at_depth(val, depth + 1) {
                    Cow::Borrowed(b) => {
                        out.insert(key.clone(), b.clone());
                    }
                    Cow::Owned(o) => {
                        changed = true;
                        out.insert(key.clone(), o);
                    }
                }
            }
            if changed {
                Cow::Owned(Value::Object(out))
            } else {
                Cow::Borrowed(value)
            }
        }
        Value::Array(items) => {
            let mut changed = false;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match sanitize_at_depth(item, depth + 1) {
                    Cow::Borrowed(b) => out.push(b.clone()),
                    Cow::Owned(o) => {
                        changed = true;
                        out.push(o);
                    }
                }
            }
            if changed {
                Cow::Owned(Value::Array(out))
            } else {
                Cow::Borrowed(value)
            }
        }
        _ => Cow::Borrowed(value),
    }
}

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static AMOUNT_RE: OnceLock<Regex> = OnceLock::new();
static ACCOUNT_RE: OnceLock<Regex> = OnceLock::new();
static NAME_RE: OnceLock<Regex> = OnceLock::new();

/// Redact free-text diagnostic snippets: emails,
/// dollar amounts, long digit runs, and capitalized name pairs are replaced
/// with placeholder tokens, then the result is truncated to `max_len`
/// characters.
pub fn redact_snippet(text: &str, max_len: usize) -> String {
    let email_re = EMAIL_RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap()
    });
    let amount_re =
        AMOUNT_RE.get_or_init(|| Regex::new(r"\$\s?\d[\d,]*(?:\.\d{2})?").unwrap());
    let account_re = ACCOUNT_RE.get_or_init(|| Regex::new(r"\d{8,}").unwrap());
    let name_re =
        NAME_RE.get_or_init(|| Regex::new(r"\b[A-Z][a-z]+\s+[A-Z][a-z]+\b").unwrap());

    let redacted = email_re.replace_all(text, "[EMAIL]");
    let redacted = amount_re.replace_all(&redacted, "[AMOUNT]");
    let redacted = account_re.replace_all(&redacted, "[ACCOUNT]");
    let redacted = name_re.replace_all(&redacted, "[NAME]");

    let redacted = redacted.into_owned();
    if redacted.chars().count() <= max_len {
        redacted
    } else {
        redacted.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitize_is_idempotent() {
        let input = json!({"tokenId": "abc", "email": "a@b.com", "amount": 1});
        let once = sanitize(&input).into_owned();
        let twice = sanitize(&once).into_owned();
        assert_eq!(once, twice);
    }

    #[test]
    fn sanitize_drops_auth_and_pii_fields() {
        let input = json!({"tokenId": "abc", "email": "a@b.com", "amount": 1});
        let out = sanitize(&input).into_owned();
        assert_eq!(out, json!({"amount": 1}));
    }

    #[test]
    fn sanitize_leaves_clean_objects_untouched_by_reference() {
        let input = json!({"id": "x", "items": [{"amount": 100}]});
        match sanitize(&input) {
            Cow::Borrowed(b) => assert_eq!(b, &input),
            Cow::Owned(_) => panic!("expected structural sharing, got an owned clone"),
        }
    }

    #[test]
    fn sanitize_drops_prototype_pollution_keys() {
        let input = json!({"a": 1, "__proto__": {"polluted": true}});
        let out = sanitize(&input).into_owned();
        assert_eq!(out, json!({"a": 1}));
    }

    #[test]
    fn sanitize_handles_deep_nesting_without_panicking() {
        let mut value = json!({"leaf": 1});
        for _ in 0..(MAX_DEPTH + 20) {
            value = json!({"nested": value});
        }
        let out = sanitize(&value);
        // Should not panic, and should terminate with the sentinel somewhere.
        assert!(out.to_string().contains("[Circular]"));
    }

    #[test]
    fn ascii_only_case_folding_misses_unicode_lookalikes() {
        // Cyrillic 'а' (U+0430) standing in for Latin 'a'.
        assert!(!is_auth_field("p\u{0430}ssword"));
        assert!(is_auth_field("password"));
    }

    #[test]
    fn field_name_forms_are_all_recognized() {
        assert!(is_pii_field("email"));
        assert!(is_pii_field("user_email"));
        assert!(is_pii_field("userEmail"));
        assert!(is_auth_field("apiKeySecret"));
        assert!(is_auth_field("API_KEY"));
    }

    #[test]
    fn redact_snippet_masks_known_patterns_and_truncates() {
        let text = "Contact Jane Doe at jane@example.com, account 12345678, amount $45.00 more text";
        let redacted = redact_snippet(text, 40);
        assert_eq!(redacted.chars().count(), 40);
        assert!(!redacted.contains("jane@example.com"));
    }
}
