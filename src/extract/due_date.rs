//! Due-date extraction: finds a date substring in free text,
//! normalizes provider month-name tables (`"October 2, 2025"`) to a form
//! [`crate::date_time::parse_date_multi`] understands, then delegates there.

use std::sync::OnceLock;

use regex::Regex;

use crate::date_time::{self, ParsedDate};

use super::ExtractError;

static ISO_RE: OnceLock<Regex> = OnceLock::new();
static SLASH_RE: OnceLock<Regex> = OnceLock::new();
static TEXTUAL_RE: OnceLock<Regex> = OnceLock::new();

fn iso_re() -> &'static Regex {
    ISO_RE.get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap())
}

fn slash_re() -> &'static Regex {
    SLASH_RE.get_or_init(|| Regex::new(r"\d{1,2}/\d{1,2}/\d{4}").unwrap())
}

fn textual_re() -> &'static Regex {
    TEXTUAL_RE.get_or_init(|| {
        Regex::new(r"(?i)(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{1,2}),?\s+(\d{4})").unwrap()
    })
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: &[&str] = &[
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ];
    MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(name))
        .map(|i| i as u32 + 1)
}

/// Extract and parse a due date from `text`.
pub fn extract(text: &str) -> Result<ParsedDate, ExtractError> {
    if let Some(m) = iso_re().find(text) {
        return date_time::parse_date_multi(m.as_str())
            .map_err(|_| ExtractError::UnsupportedDateFormat(m.as_str().to_string()));
    }
    if let Some(caps) = textual_re().captures(text) {
        let month = month_number(&caps[1]).ok_or_else(|| {
            ExtractError::UnsupportedDateFormat(caps[0].to_string())
        })?;
        let day: u32 = caps[2].parse().unwrap();
        let year: i32 = caps[3].parse().unwrap();
        let normalized = format!("{year:04}-{month:02}-{day:02}");
        return date_time::parse_date_multi(&normalized)
            .map_err(|_| ExtractError::UnsupportedDateFormat(caps[0].to_string()));
    }
    if let Some(m) = slash_re().find(text) {
        return date_time::parse_date_multi(m.as_str())
            .map_err(|_| ExtractError::UnsupportedDateFormat(m.as_str().to_string()));
    }
    Err(ExtractError::NotFound { field: "due_date" })
}
