//! Late-fee extraction: integer cents, ≥ 0; missing → 0.

use std::sync::OnceLock;

use regex::Regex;

use super::ExtractError;

static LATE_FEE_RE: OnceLock<Regex> = OnceLock::new();

fn late_fee_re() -> &'static Regex {
    LATE_FEE_RE.get_or_init(|| {
        Regex::new(r"(?i)late\s+fee\D{0,10}?\$?\s?(\d+)(?:\.(\d{2}))?").unwrap()
    })
}

/// Never fails on absence: no "late fee" phrase found means 0 cents.
pub fn extract(text: &str) -> Result<u64, ExtractError> {
    let Some(caps) = late_fee_re().captures(text) else {
        return Ok(0);
    };
    let whole: u64 = caps[1].parse().map_err(|_| ExtractError::OutOfRange {
        field: "late_fee",
        detail: "whole-dollar component out of range".to_string(),
    })?;
    let cents: u64 = caps.get(2).map(|m| m.as_str().parse().unwrap_or(0)).unwrap_or(0);
    Ok(whole * 100 + cents)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn extracts_late_fee_amount() {
        assert_eq!(extract("A late fee of $7.00 applies if missed.").unwrap(), 700);
    }

    #[test]
    fn defaults_to_zero_when_absent() {
        assert_eq!(extract("No fees mentioned here.").unwrap(), 0);
    }

    #[test]
    fn handles_whole_dollar_late_fee() {
        assert_eq!(extract("Late fee: $15").unwrap(), 1500);
    }
}
