//! Payday projection: either an explicit `paycheckDates` list
//! or cadence-based projection from a `(payCadence, nextPayday)` pair.

use chrono::{Datelike, NaiveDate};

use crate::error::PayPlanError;
use crate::model::PayCadence;

const MIN_PROJECTED: usize = 3;
const MAX_PROJECTED: usize = 6;

/// The caller-supplied payday source: exactly one of these is required.
pub enum PaydaySource {
    Explicit(Vec<NaiveDate>),
    Cadence { cadence: PayCadence, next_payday: NaiveDate },
}

/// Project 3–6 future paydays in ascending order.
pub fn project(source: PaydaySource) -> Result<Vec<NaiveDate>, PayPlanError> {
    match source {
        PaydaySource::Explicit(mut dates) => {
            if dates.len() < MIN_PROJECTED {
                return Err(PayPlanError::validation(
                    "paycheckDates",
                    format!("at least {MIN_PROJECTED} paycheck dates are required"),
                ));
            }
            dates.sort();
            Ok(dates)
        }
        PaydaySource::Cadence { cadence, next_payday } => {
            Ok(project_cadence(cadence, next_payday, MAX_PROJECTED))
        }
    }
}

fn project_cadence(cadence: PayCadence, next_payday: NaiveDate, count: usize) -> Vec<NaiveDate> {
    match cadence {
        PayCadence::Weekly => additive_days(next_payday, 7, count),
        PayCadence::Biweekly => additive_days(next_payday, 14, count),
        PayCadence::Semimonthly => semimonthly(next_payday, count),
        PayCadence::Monthly => monthly(next_payday, count),
    }
}

fn additive_days(start: NaiveDate, step_days: i64, count: usize) -> Vec<NaiveDate> {
    (0..count)
        .map(|i| start + chrono::Duration::days(step_days * i as i64))
        .collect()
}

/// The 1st and 15th of each month, starting from whichever of the two is
/// `>= next_payday`'s month anchor (the 1st if `next_payday.day() <= 15`,
/// the 15th otherwise), continuing forward.
fn semimonthly(next_payday: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(count);
    let mut year = next_payday.year();
    let mut month = next_payday.month();
    let mut on_first = next_payday.day() <= 15;

    while out.len() < count {
        let day = if on_first { 1 } else { 15 };
        out.push(NaiveDate::from_ymd_opt(year, month, day).expect("1st/15th always valid"));
        if on_first {
            on_first = false;
        } else {
            on_first = true;
            if month == 12 {
                month = 1;
                year += 1;
            } else {
                month += 1;
            }
        }
    }
    out
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid calendar month");
    (next_month_first - chrono::Duration::days(1)).day()
}

/// Strictly monthly, clamping the day-of-month to the last valid day when
/// the anchor day (e.g. the 31st) doesn't exist in a shorter month.
fn monthly(next_payday: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let anchor_day = next_payday.day();
    let mut out = Vec::with_capacity(count);
    let mut year = next_payday.year();
    let mut month = next_payday.month();
    for i in 0..count {
        if i > 0 {
            if month == 12 {
                month = 1;
                year += 1;
            } else {
                month += 1;
            }
        }
        let day = anchor_day.min(last_day_of_month(year, month));
        out.push(NaiveDate::from_ymd_opt(year, month, day).expect("clamped day is always valid"));
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn explicit_paychecks_require_at_least_three() {
        let dates = vec![
            NaiveDate::from_ymd_opt(2025, 10, 5).unwrap(),
            NaiveDate::from_ymd_opt(2025, 10, 19).unwrap(),
        ];
        assert!(project(PaydaySource::Explicit(dates)).is_err());
    }

    #[test]
    fn explicit_paychecks_are_sorted() {
        let dates = vec![
            NaiveDate::from_ymd_opt(2025, 11, 2).unwrap(),
            NaiveDate::from_ymd_opt(2025, 10, 5).unwrap(),
            NaiveDate::from_ymd_opt(2025, 10, 19).unwrap(),
        ];
        let out = project(PaydaySource::Explicit(dates)).unwrap();
        assert_eq!(out[0], NaiveDate::from_ymd_opt(2025, 10, 5).unwrap());
    }

    #[test]
    fn weekly_cadence_is_strictly_additive() {
        let out = project(PaydaySource::Cadence {
            cadence: PayCadence::Weekly,
            next_payday: NaiveDate::from_ymd_opt(2025, 10, 3).unwrap(),
        })
        .unwrap();
        assert_eq!(out.len(), MAX_PROJECTED);
        assert_eq!(out[1], NaiveDate::from_ymd_opt(2025, 10, 10).unwrap());
    }

    #[test]
    fn biweekly_cadence_steps_fourteen_days() {
        let out = project(PaydaySource::Cadence {
            cadence: PayCadence::Biweekly,
            next_payday: NaiveDate::from_ymd_opt(2025, 10, 3).unwrap(),
        })
        .unwrap();
        assert_eq!(out[1], NaiveDate::from_ymd_opt(2025, 10, 17).unwrap());
    }

    #[test]
    fn semimonthly_cadence_is_first_and_fifteenth() {
        let out = project(PaydaySource::Cadence {
            cadence: PayCadence::Semimonthly,
            next_payday: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
        })
        .unwrap();
        assert_eq!(out[0], NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
        assert_eq!(out[1], NaiveDate::from_ymd_opt(2025, 10, 15).unwrap());
        assert_eq!(out[2], NaiveDate::from_ymd_opt(2025, 11, 1).unwrap());
    }

    #[test]
    fn monthly_cadence_clamps_day_of_month() {
        let out = project(PaydaySource::Cadence {
            cadence: PayCadence::Monthly,
            next_payday: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        })
        .unwrap();
        // February has no 31st; clamp to the 28th (2025 is not a leap year).
        assert_eq!(out[1], NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        assert_eq!(out[2], NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
    }
}
