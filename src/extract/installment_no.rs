//! Installment-number extraction: parses phrases like
//! `"payment 2 of 4"` or `"installment #3"`. Must resolve to an integer ≥ 1.

use std::sync::OnceLock;

use regex::Regex;

use super::ExtractError;

static OF_N_RE: OnceLock<Regex> = OnceLock::new();
static HASH_RE: OnceLock<Regex> = OnceLock::new();

fn of_n_re() -> &'static Regex {
    OF_N_RE.get_or_init(|| Regex::new(r"(?i)payment\s+(\d+)\s+of\s+\d+").unwrap())
}

fn hash_re() -> &'static Regex {
    HASH_RE.get_or_init(|| Regex::new(r"(?i)installment\s*#?\s*(\d+)").unwrap())
}

pub fn extract(text: &str) -> Result<u32, ExtractError> {
    let raw = of_n_re()
        .captures(text)
        .or_else(|| hash_re().captures(text))
        .ok_or(ExtractError::NotFound { field: "installment_no" })?;
    let n: u32 = raw[1]
        .parse()
        .map_err(|_| ExtractError::OutOfRange {
            field: "installment_no",
            detail: "not a valid integer".to_string(),
        })?;
    if n == 0 {
        return Err(ExtractError::OutOfRange {
            field: "installment_no",
            detail: "installment numbers start at 1".to_string(),
        });
    }
    Ok(n)
}
