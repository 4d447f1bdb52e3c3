//! RFC 5545 iCalendar generation. Produces one `VCALENDAR`
//! with a `VTIMEZONE` for the request zone and one `VEVENT` per "This Week"
//! installment, base64-encoded for embedding in a JSON response.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{Datelike, NaiveDate, TimeZone};
use chrono_tz::Tz;
use rust_decimal::Decimal;

use crate::model::{RiskFlag, ShiftedInstallment};

fn dollars(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn fold_crlf(s: &str) -> String {
    s.replace('\n', "\\n")
}

/// A minimal but DST-accurate `VTIMEZONE` block: one `STANDARD` and one
/// `DAYLIGHT` sub-component derived from the zone's offset on Jan 1 and
/// Jul 1 of `year`. Zones with no DST transitions emit identical
/// `STANDARD`/`DAYLIGHT` offsets, which is a valid (if redundant) VTIMEZONE.
fn vtimezone(tz: Tz, year: i32) -> String {
    let winter = tz
        .from_local_datetime(&NaiveDate::from_ymd_opt(year, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
        .single()
        .expect("Jan 1 midnight is never ambiguous");
    let summer = tz
        .from_local_datetime(&NaiveDate::from_ymd_opt(year, 7, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
        .single()
        .expect("Jul 1 midnight is never ambiguous");
    let winter_offset = winter.offset().fix().local_minus_utc();
    let summer_offset = summer.offset().fix().local_minus_utc();

    format_offset_block(tz, winter_offset, summer_offset)
}

fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { "-" } else { "+" };
    let abs = seconds.unsigned_abs();
    format!("{sign}{:02}{:02}", abs / 3600, (abs % 3600) / 60)
}

fn format_offset_block(tz: Tz, winter_offset: i32, summer_offset: i32) -> String {
    let mut lines = vec!["BEGIN:VTIMEZONE".to_string(), format!("TZID:{tz}")];
    lines.push("BEGIN:STANDARD".to_string());
    lines.push("DTSTART:19700101T000000".to_string());
    lines.push(format!("TZOFFSETFROM:{}", format_offset(summer_offset)));
    lines.push(format!("TZOFFSETTO:{}", format_offset(winter_offset)));
    lines.push("END:STANDARD".to_string());
    if summer_offset != winter_offset {
        lines.push("BEGIN:DAYLIGHT".to_string());
        lines.push("DTSTART:19700101T000000".to_string());
        lines.push(format!("TZOFFSETFROM:{}", format_offset(winter_offset)));
        lines.push(format!("TZOFFSETTO:{}", format_offset(summer_offset)));
        lines.push("END:DAYLIGHT".to_string());
    }
    lines.push("END:VTIMEZONE".to_string());
    lines.join("\r\n")
}

fn vevent(tz: Tz, item: &ShiftedInstallment, risks: &[RiskFlag], include_alarm: bool) -> String {
    let date = NaiveDate::parse_from_str(&item.installment.due_date, "%Y-%m-%d")
        .expect("due_date is validated as YYYY-MM-DD");
    let compact = date.format("%Y%m%d").to_string();

    let summary = if item.was_shifted {
        format!("{} ${} (shifted)", item.installment.provider, dollars(item.installment.amount))
    } else {
        format!("{} ${}", item.installment.provider, dollars(item.installment.amount))
    };

    let mut description_lines = vec![format!("Installment #{}", item.installment.installment_no)];
    if let Some(original) = &item.original_due_date {
        description_lines.push(format!("Originally due: {original}"));
        description_lines.push(format!("Shifted to: {}", item.installment.due_date));
    }
    for risk in risks.iter().filter(|r| {
        r.affected
            .iter()
            .any(|(p, n)| *p == item.installment.provider && *n == item.installment.installment_no)
    }) {
        description_lines.push(risk.message.clone());
    }
    let description = fold_crlf(&description_lines.join("\n"));

    let mut lines = vec![
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}-{}@payplan", item.installment.provider.to_lowercase(), item.installment.installment_no),
        format!("DTSTART;TZID={tz}:{compact}T090000"),
        "DURATION:PT30M".to_string(),
        format!("SUMMARY:{}", fold_crlf(&summary)),
        format!("DESCRIPTION:{description}"),
    ];
    if include_alarm {
        lines.push("BEGIN:VALARM".to_string());
        lines.push("ACTION:DISPLAY".to_string());
        lines.push(format!("DESCRIPTION:{}", fold_crlf(&summary)));
        lines.push("TRIGGER:-P1D".to_string());
        lines.push("END:VALARM".to_string());
    }
    lines.push("END:VEVENT".to_string());
    lines.join("\r\n")
}

/// Build the raw (unencoded) RFC 5545 calendar text for the given items,
/// restricted to the "This Week" filter by the caller (see [`crate::actions::this_week`]).
pub fn build_calendar(tz: Tz, items: &[ShiftedInstallment], risks: &[RiskFlag], include_alarms: bool) -> String {
    let year = items
        .first()
        .and_then(|i| NaiveDate::parse_from_str(&i.installment.due_date, "%Y-%m-%d").ok())
        .map(|d| d.year())
        .unwrap_or_else(|| chrono::Utc::now().year());

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//PayPlan//Planning Pipeline//EN".to_string(),
        "CALSCALE:GREGORIAN".to_string(),
        vtimezone(tz, year),
    ];
    for item in items {
        lines.push(vevent(tz, item, risks, include_alarms));
    }
    lines.push("END:VCALENDAR".to_string());
    lines.join("\r\n")
}

/// Base64-encode the calendar text for JSON transport.
pub fn build_calendar_base64(tz: Tz, items: &[ShiftedInstallment], risks: &[RiskFlag], include_alarms: bool) -> String {
    BASE64.encode(build_calendar(tz, items, risks, include_alarms))
}
