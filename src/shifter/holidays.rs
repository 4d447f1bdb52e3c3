//! The US federal holiday table used by the business-day shifter.
//! Observed-date rules follow 5 U.S.C. § 6103: a holiday falling on
//! Saturday is observed the preceding Friday; one falling on Sunday is
//! observed the following Monday.

use chrono::{Datelike, NaiveDate, Weekday};

fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, n: u32) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid calendar month");
    let first_offset = (7 + weekday.num_days_from_monday() as i64
        - first.weekday().num_days_from_monday() as i64)
        % 7;
    first + chrono::Duration::days(first_offset + 7 * (n as i64 - 1))
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid calendar month");
    let last_of_month = next_month_first - chrono::Duration::days(1);
    let back_offset = (7 + last_of_month.weekday().num_days_from_monday() as i64
        - weekday.num_days_from_monday() as i64)
        % 7;
    last_of_month - chrono::Duration::days(back_offset)
}

fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - chrono::Duration::days(1),
        Weekday::Sun => date + chrono::Duration::days(1),
        _ => date,
    }
}

/// The eleven permanent US federal holidays (Juneteenth included, effective
/// 2021 onward) observed in `year`, with weekend observed-date shifting
/// already applied.
pub fn federal_holidays(year: i32) -> Vec<NaiveDate> {
    let fixed = [
        (1, 1),   // New Year's Day
        (6, 19),  // Juneteenth
        (7, 4),   // Independence Day
        (11, 11), // Veterans Day
        (12, 25), // Christmas Day
    ];
    let mut out: Vec<NaiveDate> = fixed
        .iter()
        .map(|&(m, d)| observed(NaiveDate::from_ymd_opt(year, m, d).expect("valid fixed date")))
        .collect();

    out.push(nth_weekday_of_month(year, 1, Weekday::Mon, 3)); // MLK Day
    out.push(nth_weekday_of_month(year, 2, Weekday::Mon, 3)); // Washington's Birthday
    out.push(last_weekday_of_month(year, 5, Weekday::Mon)); // Memorial Day
    out.push(nth_weekday_of_month(year, 9, Weekday::Mon, 1)); // Labor Day
    out.push(nth_weekday_of_month(year, 10, Weekday::Mon, 2)); // Columbus Day
    out.push(nth_weekday_of_month(year, 11, Weekday::Thu, 4)); // Thanksgiving

    out.sort();
    out
}

pub fn is_federal_holiday(date: NaiveDate) -> bool {
    federal_holidays(date.year()).contains(&date)
}
