//! Provider detection: map raw email text to a BNPL provider
//! tag using sender-domain matches, brand-keyword co-location, and a
//! subdomain-spoof check — in that priority order.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Klarna,
    Affirm,
    Afterpay,
    PayPalPayIn4,
    Zip,
    Sezzle,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Klarna => "Klarna",
            Provider::Affirm => "Affirm",
            Provider::Afterpay => "Afterpay",
            Provider::PayPalPayIn4 => "PayPal Pay-in-4",
            Provider::Zip => "Zip",
            Provider::Sezzle => "Sezzle",
        }
    }

    fn domains(self) -> &'static [&'static str] {
        match self {
            Provider::Klarna => &["klarna.com"],
            Provider::Affirm => &["affirm.com"],
            Provider::Afterpay => &["afterpay.com"],
            Provider::PayPalPayIn4 => &["paypal.com"],
            Provider::Zip => &["zip.co", "quadpay.com"],
            Provider::Sezzle => &["sezzle.com"],
        }
    }

    fn brand_keyword(self) -> &'static str {
        match self {
            Provider::Klarna => "klarna",
            Provider::Affirm => "affirm",
            Provider::Afterpay => "afterpay",
            Provider::PayPalPayIn4 => "paypal",
            Provider::Zip => "zip",
            Provider::Sezzle => "sezzle",
        }
    }

    fn all() -> &'static [Provider] {
        &[
            Provider::Klarna,
            Provider::Affirm,
            Provider::Afterpay,
            Provider::PayPalPayIn4,
            Provider::Zip,
            Provider::Sezzle,
        ]
    }
}

/// Outcome of [`detect`]: either a confident provider tag, or `Unknown`
/// together with a reason suitable for an [`crate::model::ExtractionIssue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    Known(Provider),
    Suspicious { brand: Provider, sender_domain: String },
    Unknown,
}

static SENDER_RE: OnceLock<Regex> = OnceLock::new();
static INSTALLMENT_PHRASE_RE: OnceLock<Regex> = OnceLock::new();

fn sender_re() -> &'static Regex {
    SENDER_RE.get_or_init(|| Regex::new(r"(?i)from:.*@([a-z0-9.-]+\.[a-z]{2,})").unwrap())
}

fn installment_phrase_re() -> &'static Regex {
    INSTALLMENT_PHRASE_RE
        .get_or_init(|| Regex::new(r"(?i)payment\s+\d+\s+of\s+\d+|installment").unwrap())
}

/// Detect the BNPL provider for one email segment.
///
/// Priority order:
/// 1. Sender-domain match against a provider's known domains.
/// 2. Brand keyword located within 80 characters of an installment phrase
///    (so the verb "zip" in ordinary text doesn't false-positive as Zip).
/// 3. If a brand keyword appears as a subdomain of a domain that is *not*
///    one of that brand's own domains (`klarna.evil.com`), report it as
///    suspicious rather than a confident match.
pub fn detect(text: &str) -> Detection {
    if let Some(caps) = sender_re().captures(text) {
        let sender_domain = caps[1].to_ascii_lowercase();
        for provider in Provider::all() {
            if provider
                .domains()
                .iter()
                .any(|d| sender_domain == *d || sender_domain.ends_with(&format!(".{d}")))
            {
                return Detection::Known(*provider);
            }
        }
        for provider in Provider::all() {
            if sender_domain.contains(provider.brand_keyword())
                && !provider
                    .domains()
                    .iter()
                    .any(|d| sender_domain == *d || sender_domain.ends_with(&format!(".{d}")))
            {
                return Detection::Suspicious {
                    brand: *provider,
                    sender_domain,
                };
            }
        }
    }

    let lower = text.to_ascii_lowercase();
    for provider in Provider::all() {
        if let Some(pos) = lower.find(provider.brand_keyword()) {
            let window_start = pos.saturating_sub(80);
            let window_end = (pos + provider.brand_keyword().len() + 80).min(lower.len());
            let window = &lower[window_start..window_end];
            if installment_phrase_re().is_match(window) {
                return Detection::Known(*provider);
            }
        }
    }

    Detection::Unknown
}
