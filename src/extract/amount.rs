//! Dollar-amount extraction. Returns integer cents; rejects
//! zero, NaN/Infinity-producing text, and scientific notation that would
//! overflow an `i64` cent count. Negative amounts (refunds) are allowed —
//! downstream risk detection decides what to do with them (see
//! `crate::risk`, and the open question recorded in DESIGN.md).

use std::sync::OnceLock;

use regex::Regex;

use super::ExtractError;

static AMOUNT_RE: OnceLock<Regex> = OnceLock::new();

fn amount_re() -> &'static Regex {
    // A leading sign, optional `$`, thousands separators, optional cents.
    AMOUNT_RE.get_or_init(|| {
        Regex::new(r"(-)?\$?\s?(\d{1,3}(?:,\d{3})*|\d+)(?:\.(\d{2}))?").unwrap()
    })
}

/// Find the first plausible dollar amount in `text` and convert it to
/// integer cents.
pub fn extract(text: &str) -> Result<i64, ExtractError> {
    // Scientific notation ("4.5e10") never denotes a currency amount in any
    // supported provider template; reject outright rather than let the
    // generic regex silently pick up the mantissa.
    if text.to_ascii_lowercase().contains('e') && Regex::new(r"\d[eE][+-]?\d").unwrap().is_match(text) {
        return Err(ExtractError::OutOfRange {
            field: "amount",
            detail: "scientific notation is not a supported amount format".to_string(),
        });
    }

    let caps = amount_re()
        .captures(text)
        .ok_or(ExtractError::NotFound { field: "amount" })?;

    let negative = caps.get(1).is_some();
    let whole: i64 = caps[2]
        .replace(',', "")
        .parse()
        .map_err(|_| ExtractError::OutOfRange {
            field: "amount",
            detail: "whole-dollar component out of range".to_string(),
        })?;
    let cents: i64 = caps
        .get(3)
        .map(|m| m.as_str().parse().unwrap_or(0))
        .unwrap_or(0);

    let total = whole
        .checked_mul(100)
        .and_then(|v| v.checked_add(cents))
        .ok_or(ExtractError::OutOfRange {
            field: "amount",
            detail: "amount overflows supported range".to_string(),
        })?;

    if total == 0 {
        return Err(ExtractError::OutOfRange {
            field: "amount",
            detail: "zero is not a valid installment amount".to_string(),
        });
    }

    Ok(if negative { -total } else { total })
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Your payment of $45.00 is due", 4500)]
    #[case("Amount: $1,234.56", 123456)]
    #[case("Total due: 45", 4500)]
    fn extracts_positive_amounts(#[case] text: &str, #[case] expected: i64) {
        assert_eq!(extract(text).unwrap(), expected);
    }

    #[test]
    fn extracts_negative_refund_amount() {
        assert_eq!(extract("Refund of -$20.00 processed").unwrap(), -2000);
    }

    #[test]
    fn rejects_zero_amount() {
        assert!(extract("Amount: $0.00").is_err());
    }

    #[test]
    fn rejects_scientific_notation() {
        assert!(extract("Amount: 4.5e10").is_err());
    }

    #[test]
    fn not_found_when_no_digits() {
        assert!(extract("no numbers here at all").is_err());
    }
}
