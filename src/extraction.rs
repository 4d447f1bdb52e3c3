//! Extraction orchestration: splits raw pasted text into
//! per-email segments, runs the field extractors over each,
//! deduplicates, scores confidence, collects redacted issues, and caches
//! the whole result.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use chrono_tz::Tz;
use lru::LruCache;
use regex::Regex;

use crate::canonical::sha256_hex;
use crate::extract;
use crate::model::{ExtractionIssue, ExtractionItem, Installment};
use crate::providers::{self, Detection};

/// Soft wall-clock ceiling for a single extraction call.
const TIME_BUDGET: Duration = Duration::from_secs(1);
const CACHE_CAPACITY: usize = 256;
const CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub items: Vec<ExtractionItem>,
    pub issues: Vec<ExtractionIssue>,
    pub duplicates_removed: usize,
}

static FENCE_RE: OnceLock<Regex> = OnceLock::new();
static HEADER_BOUNDARY_RE: OnceLock<Regex> = OnceLock::new();

fn fence_re() -> &'static Regex {
    FENCE_RE.get_or_init(|| Regex::new(r"(?m)^-{3,}\s*$").unwrap())
}

fn header_boundary_re() -> &'static Regex {
    HEADER_BOUNDARY_RE.get_or_init(|| Regex::new(r"(?m)^\s*\n(?=From:)").unwrap())
}

/// Split raw pasted text into per-email segments: explicit `---` fences
/// take priority; absent those, fall back to splitting on a blank line
/// immediately preceding a `From:` header.
fn split_segments(text: &str) -> Vec<String> {
    let segments: Vec<String> = if fence_re().is_match(text) {
        fence_re().split(text).map(|s| s.to_string()).collect()
    } else if header_boundary_re().is_match(text) {
        header_boundary_re().split(text).map(|s| s.to_string()).collect()
    } else {
        vec![text.to_string()]
    };
    segments
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extract a single segment into an [`ExtractionItem`], or an issue
/// describing why it couldn't be resolved.
fn extract_segment(segment: &str, tz: Tz) -> Result<ExtractionItem, ExtractionIssue> {
    let detection = providers::detect(segment);
    let provider = match detection {
        Detection::Known(p) => Some(p),
        Detection::Suspicious { .. } | Detection::Unknown => None,
    };

    let due_date = extract::extract_due_date(segment).ok();
    let amount = extract::extract_amount(segment).ok();
    let installment_no = extract::extract_installment_no(segment).ok();
    let autopay = extract::extract_autopay(segment);
    let late_fee = extract::extract_late_fee(segment).unwrap_or(0);
    let currency = extract::extract_currency(segment).unwrap_or_else(|_| "USD".to_string());

    let Some(amount) = amount else {
        return Err(issue(segment, "no amount could be extracted", provider));
    };
    let Some(due_date) = due_date else {
        return Err(issue(segment, "no due date could be extracted", provider));
    };
    let Some(installment_no) = installment_no else {
        return Err(issue(segment, "no installment number could be extracted", provider));
    };
    let Some(provider) = provider else {
        return Err(issue(segment, "no known BNPL provider detected", None));
    };

    // Installment.due_date is a plain calendar date; the zoned
    // conversion only needs to prove the date resolves in `tz` at all.
    let _ = crate::date_time::to_zoned_iso8601(due_date.date, tz);
    let due_date_iso = due_date.date.to_string();

    let confidence = 0.35 + 0.25 + 0.20 + 0.15 + if autopay { 0.05 } else { 0.0 };

    Ok(ExtractionItem {
        installment: Installment {
            provider: provider.as_str().to_string(),
            installment_no,
            due_date: due_date_iso,
            amount,
            currency,
            autopay,
            late_fee,
        },
        confidence,
    })
}

fn issue(segment: &str, reason: &str, provider: Option<providers::Provider>) -> ExtractionIssue {
    ExtractionIssue {
        snippet: crate::pii::redact_snippet(segment, 200),
        reason: reason.to_string(),
        provider: provider.map(|p| p.as_str().to_string()),
    }
}

fn dedup_key(item: &ExtractionItem) -> (String, u32, String, i64) {
    (
        item.installment.provider.clone(),
        item.installment.installment_no,
        item.installment.due_date.clone(),
        item.installment.amount,
    )
}

/// Run the full orchestration over one request's worth of pasted text.
/// Never panics or propagates extraction failures to the caller — field and
/// segment failures always become [`ExtractionIssue`]s.
pub fn extract_all(text: &str, tz: Tz) -> ExtractionResult {
    let deadline = Instant::now() + TIME_BUDGET;
    let segments = split_segments(text);

    let mut items = Vec::new();
    let mut issues = Vec::new();

    for segment in &segments {
        if Instant::now() > deadline {
            issues.push(ExtractionIssue {
                snippet: crate::pii::redact_snippet(segment, 200),
                reason: "extraction time budget exceeded; remaining segments skipped".to_string(),
                provider: None,
            });
            break;
        }
        match extract_segment(segment, tz) {
            Ok(item) => items.push(item),
            Err(issue) => issues.push(issue),
        }
    }

    let mut seen = HashSet::new();
    let mut duplicates_removed = 0;
    items.retain(|item| {
        if seen.insert(dedup_key(item)) {
            true
        } else {
            duplicates_removed += 1;
            false
        }
    });

    ExtractionResult { items, issues, duplicates_removed }
}

struct CacheEntry {
    result: ExtractionResult,
    inserted_at: Instant,
}

static CACHE: OnceLock<Mutex<LruCache<String, CacheEntry>>> = OnceLock::new();

fn cache() -> &'static Mutex<LruCache<String, CacheEntry>> {
    CACHE.get_or_init(|| Mutex::new(LruCache::new(NonZeroUsize::new(CACHE_CAPACITY).unwrap())))
}

/// The largest byte index `<= idx` that lies on a UTF-8 char boundary of
/// `text`. Stdlib's `str::floor_char_boundary` isn't stable, so walk back
/// by hand; a multibyte character never spans more than 4 bytes.
fn floor_char_boundary(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Sampled hash of the input (first/last 4KB plus length, rather than the
/// whole body) combined with the timezone and option set that affects
/// output.
fn cache_key(text: &str, tz: Tz, options: &str) -> String {
    let sample: String = if text.len() <= 8192 {
        text.to_string()
    } else {
        let head_end = floor_char_boundary(text, 4096);
        let tail_start = floor_char_boundary(text, text.len() - 4096);
        format!("{}{}", &text[..head_end], &text[tail_start..])
    };
    sha256_hex(&format!("{}|{}|{tz}|{options}", sample, text.len()))
}

/// Cached wrapper around [`extract_all`]. A cache hit returns a clone of the
/// stored result without re-running extraction and refreshes its LRU
/// position; an expired entry is treated as a miss and recomputed.
pub fn extract_all_cached(text: &str, tz: Tz, options: &str) -> ExtractionResult {
    let key = cache_key(text, tz, options);
    {
        let mut guard = cache().lock().unwrap();
        if let Some(entry) = guard.get(&key) {
            if entry.inserted_at.elapsed() < CACHE_TTL {
                return entry.result.clone();
            }
        }
    }
    let result = extract_all(text, tz);
    cache().lock().unwrap().put(
        key,
        CacheEntry { result: result.clone(), inserted_at: Instant::now() },
    );
    result
}

#[cfg(test)]
mod test {
    use super::*;

    const KLARNA_EMAIL: &str = "From: billing@klarna.com\nYour payment 1 of 4 of $45.00 is due 2025-10-02. Autopay is on.";
    const AFFIRM_EMAIL: &str = "From: statements@affirm.com\nPayment 2 of 4 of $58.00 due 2025-10-16. A late fee of $15.00 applies if missed.";

    #[test]
    fn extracts_single_well_formed_email() {
        let result = extract_all(KLARNA_EMAIL, Tz::UTC);
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].installment.provider, "Klarna");
        assert!(result.items[0].installment.autopay);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn splits_multiple_emails_on_fence() {
        let combined = format!("{KLARNA_EMAIL}\n---\n{AFFIRM_EMAIL}");
        let result = extract_all(&combined, Tz::UTC);
        assert_eq!(result.items.len(), 2);
    }

    #[test]
    fn splits_multiple_emails_on_header_boundary_without_fence() {
        let combined = format!("{KLARNA_EMAIL}\n\n{AFFIRM_EMAIL}");
        let result = extract_all(&combined, Tz::UTC);
        assert_eq!(result.items.len(), 2);
    }

    #[test]
    fn unknown_provider_becomes_an_issue_not_a_panic() {
        let result = extract_all("Hi, just checking in about the weekend plans.", Tz::UTC);
        assert!(result.items.is_empty());
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn duplicate_segments_are_deduplicated() {
        let combined = format!("{KLARNA_EMAIL}\n---\n{KLARNA_EMAIL}");
        let result = extract_all(&combined, Tz::UTC);
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.duplicates_removed, 1);
    }

    #[test]
    fn issue_snippets_are_pii_redacted() {
        let text = "From: jane.doe@example.com\nContact Jane Doe for details, no BNPL info here.";
        let result = extract_all(text, Tz::UTC);
        assert!(result.issues.iter().all(|i| !i.snippet.contains("jane.doe@example.com")));
    }

    #[test]
    fn cached_call_returns_equal_result_on_repeat() {
        let first = extract_all_cached(KLARNA_EMAIL, Tz::UTC, "{}");
        let second = extract_all_cached(KLARNA_EMAIL, Tz::UTC, "{}");
        assert_eq!(first, second);
    }
}
