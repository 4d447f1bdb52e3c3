//! Timezone and date utilities.

use chrono::{Datelike, NaiveDate, TimeZone};
use chrono_tz::Tz;
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::PayPlanError;

static ABBREVIATION_RE: OnceLock<Regex> = OnceLock::new();

fn abbreviation_re() -> &'static Regex {
    ABBREVIATION_RE.get_or_init(|| Regex::new(r"^(?:[A-Z]{2,5}|UTC|GMT)([+-]\d{1,2})?$").unwrap())
}

/// Validate an IANA zone name (e.g. `"America/New_York"`). Rejects bare
/// abbreviations (`EST`, `PST`, `GMT+5`, ...) even where the `chrono_tz`
/// database happens to define a matching fixed-offset alias: a real IANA
/// zone identifier is either `"UTC"` or an `Area/Location` path.
pub fn validate_timezone(name: &str) -> Result<Tz, PayPlanError> {
    if name != "UTC" && !name.contains('/') {
        return Err(invalid_timezone(name));
    }
    if abbreviation_re().is_match(name) && name != "UTC" {
        return Err(invalid_timezone(name));
    }
    Tz::from_str(name).map_err(|_| invalid_timezone(name))
}

fn invalid_timezone(name: &str) -> PayPlanError {
    PayPlanError::validation("timeZone", format!("'{name}' is not a valid IANA timezone"))
}

/// Result of parsing a user-supplied date string that might be ambiguous
/// (e.g. `"03/04/2025"` could be March 4th or April 3rd).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    pub date: NaiveDate,
    pub ambiguous: bool,
}

static ISO_RE: OnceLock<Regex> = OnceLock::new();
static SLASH_RE: OnceLock<Regex> = OnceLock::new();

fn iso_re() -> &'static Regex {
    ISO_RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap())
}

fn slash_re() -> &'static Regex {
    SLASH_RE.get_or_init(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap())
}

/// Parse `YYYY-MM-DD`, `MM/DD/YYYY`, or `DD/MM/YYYY`. Slash dates default to
/// `MM/DD/YYYY` (the US convention used by every supported provider's
/// emails) unless the first component is `> 12`, which can only be a day —
/// that case is unambiguously read as `DD/MM/YYYY`. Whenever both
/// components are `<= 12` the date is flagged `ambiguous` so callers can
/// surface a locale prompt, even though it's resolved as `MM/DD/YYYY`.
pub fn parse_date_multi(raw: &str) -> Result<ParsedDate, PayPlanError> {
    let raw = raw.trim();
    if let Some(caps) = iso_re().captures(raw) {
        let y: i32 = caps[1].parse().unwrap();
        let m: u32 = caps[2].parse().unwrap();
        let d: u32 = caps[3].parse().unwrap();
        let date = NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| unsupported_format(raw))?;
        return Ok(ParsedDate { date, ambiguous: false });
    }
    if let Some(caps) = slash_re().captures(raw) {
        let first: u32 = caps[1].parse().unwrap();
        let second: u32 = caps[2].parse().unwrap();
        let year: i32 = caps[3].parse().unwrap();
        let (month, day, ambiguous) = if first > 12 {
            // Only valid as DD/MM/YYYY.
            (second, first, false)
        } else if second > 12 {
            // Only valid as MM/DD/YYYY.
            (first, second, false)
        } else {
            (first, second, first != second)
        };
        let date =
            NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| unsupported_format(raw))?;
        return Ok(ParsedDate { date, ambiguous });
    }
    Err(unsupported_format(raw))
}

fn unsupported_format(raw: &str) -> PayPlanError {
    PayPlanError::validation("due_date", format!("'{raw}' is not a supported date format"))
}

/// Render a calendar date as a zoned ISO-8601 timestamp with DST-aware UTC
/// offset, at local midnight in `tz`.
pub fn to_zoned_iso8601(date: NaiveDate, tz: Tz) -> Result<String, PayPlanError> {
    let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    let zoned = tz
        .from_local_datetime(&midnight)
        .single()
        .ok_or_else(|| PayPlanError::internal(format!("ambiguous local time in {tz} for {date}")))?;
    Ok(zoned.to_rfc3339())
}

/// The UTC offset, in seconds, `tz` observes on `date` — positive east of
/// UTC. Accounts for DST transitions within the zone's history.
pub fn dst_offset_seconds(date: NaiveDate, tz: Tz) -> Result<i32, PayPlanError> {
    let noon = date.and_hms_opt(12, 0, 0).expect("noon is always valid");
    let zoned = tz.from_local_datetime(&noon).single().ok_or_else(|| {
        PayPlanError::internal(format!("ambiguous local time in {tz} for {date}"))
    })?;
    Ok(zoned.offset().fix().local_minus_utc())
}

/// Mon=1..Sun=7 ISO week bounds for `date`, computed via explicit weekday
/// arithmetic — never a locale-dependent "start of week" helper.
pub fn iso_week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let days_from_monday = date.weekday().num_days_from_monday() as i64;
    let monday = date - chrono::Duration::days(days_from_monday);
    let sunday = monday + chrono::Duration::days(6);
    (monday, sunday)
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[test]
    fn accepts_named_iana_zones() {
        assert!(validate_timezone("America/New_York").is_ok());
        assert!(validate_timezone("UTC").is_ok());
    }

    #[rstest]
    #[case("EST")]
    #[case("PST")]
    #[case("GMT+5")]
    #[case("GMT-8")]
    fn rejects_abbreviations(#[case] name: &str) {
        assert!(validate_timezone(name).is_err());
    }

    #[test]
    fn iso_date_parses_unambiguously() {
        let p = parse_date_multi("2025-10-02").unwrap();
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2025, 10, 2).unwrap());
        assert!(!p.ambiguous);
    }

    #[rstest]
    #[case("03/04/2025", 3, 4, true)]
    #[case("13/04/2025", 4, 13, false)]
    #[case("03/25/2025", 3, 25, false)]
    fn slash_dates_flag_ambiguity(
        #[case] raw: &str,
        #[case] month: u32,
        #[case] day: u32,
        #[case] ambiguous: bool,
    ) {
        let p = parse_date_multi(raw).unwrap();
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2025, month, day).unwrap());
        assert_eq!(p.ambiguous, ambiguous);
    }

    #[test]
    fn iso_week_bounds_are_monday_to_sunday() {
        // 2025-10-02 is a Thursday.
        let (mon, sun) = iso_week_bounds(NaiveDate::from_ymd_opt(2025, 10, 2).unwrap());
        assert_eq!(mon, NaiveDate::from_ymd_opt(2025, 9, 29).unwrap());
        assert_eq!(sun, NaiveDate::from_ymd_opt(2025, 10, 5).unwrap());
        assert_eq!(mon.weekday(), chrono::Weekday::Mon);
        assert_eq!(sun.weekday(), chrono::Weekday::Sun);
    }

    #[test]
    fn dst_offset_differs_between_winter_and_summer_in_new_york() {
        let tz = Tz::America__New_York;
        let winter = dst_offset_seconds(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(), tz).unwrap();
        let summer = dst_offset_seconds(NaiveDate::from_ymd_opt(2025, 7, 15).unwrap(), tz).unwrap();
        assert_eq!(winter, -5 * 3600);
        assert_eq!(summer, -4 * 3600);
    }
}
