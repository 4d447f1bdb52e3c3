//! Autopay extraction: keyword match on enabled/disabled
//! phrasing; missing keyword defaults to `false`.

use std::sync::OnceLock;

use regex::Regex;

static ON_RE: OnceLock<Regex> = OnceLock::new();
static OFF_RE: OnceLock<Regex> = OnceLock::new();

fn on_re() -> &'static Regex {
    ON_RE.get_or_init(|| {
        Regex::new(r"(?i)auto-?pay\s+is\s+on|auto-?pay\s+enabled").unwrap()
    })
}

fn off_re() -> &'static Regex {
    OFF_RE.get_or_init(|| {
        Regex::new(r"(?i)auto-?pay\s+is\s+off|auto-?pay\s+disabled").unwrap()
    })
}

/// Never fails: absence of either keyword defaults to `false`, per spec.
pub fn extract(text: &str) -> bool {
    if off_re().is_match(text) {
        return false;
    }
    on_re().is_match(text)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detects_autopay_on() {
        assert!(extract("Autopay is on for this installment."));
        assert!(extract("Your auto-pay enabled account will be charged."));
    }

    #[test]
    fn detects_autopay_off() {
        assert!(!extract("Autopay is off for this installment."));
        assert!(!extract("Auto-pay disabled per your request."));
    }

    #[test]
    fn defaults_false_when_unmentioned() {
        assert!(!extract("Your payment is due soon."));
    }

    #[test]
    fn off_takes_precedence_if_both_keywords_somehow_appear() {
        assert!(!extract("Autopay is off. (Previously autopay enabled.)"));
    }
}
