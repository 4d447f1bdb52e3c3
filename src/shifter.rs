//! Business-day shifting: moves a due date forward to the
//! earliest business day at or after itself, under a configurable policy.

mod holidays;

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashSet;

use crate::model::{Installment, MovementRecord, ShiftReason, ShiftedInstallment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Country {
    Us,
    None,
}

/// Options governing the shifting algorithm.
#[derive(Debug, Clone)]
pub struct ShiftOptions {
    pub business_day_mode: bool,
    pub country: Country,
    pub custom_skip_dates: HashSet<NaiveDate>,
}

impl Default for ShiftOptions {
    fn default() -> Self {
        ShiftOptions {
            business_day_mode: true,
            country: Country::Us,
            custom_skip_dates: HashSet::new(),
        }
    }
}

fn shift_reason_for(date: NaiveDate, opts: &ShiftOptions) -> Option<ShiftReason> {
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return Some(ShiftReason::Weekend);
    }
    if opts.country == Country::Us && holidays::is_federal_holiday(date) {
        return Some(ShiftReason::Holiday);
    }
    if opts.custom_skip_dates.contains(&date) {
        return Some(ShiftReason::Custom);
    }
    None
}

/// Shift `date` forward to the earliest business day `>= date`, per the
/// first shifting reason it was blocked by. Returns `None` if `date` was
/// already a business day.
pub fn shift_date(date: NaiveDate, opts: &ShiftOptions) -> (NaiveDate, Option<ShiftReason>) {
    if !opts.business_day_mode {
        return (date, None);
    }
    let first_reason = shift_reason_for(date, opts);
    if first_reason.is_none() {
        return (date, None);
    }
    let mut cursor = date;
    loop {
        cursor += chrono::Duration::days(1);
        if shift_reason_for(cursor, opts).is_none() {
            return (cursor, first_reason);
        }
    }
}

/// Apply [`shift_date`] to every installment, returning the shifted
/// schedule and the movement records, sorted by
/// `shiftedDueDate, provider`.
pub fn shift_all(
    installments: &[Installment],
    opts: &ShiftOptions,
) -> (Vec<ShiftedInstallment>, Vec<MovementRecord>) {
    let mut shifted = Vec::with_capacity(installments.len());
    let mut movements = Vec::new();

    for inst in installments {
        let original_date = NaiveDate::parse_from_str(&inst.due_date, "%Y-%m-%d")
            .expect("Installment.due_date is validated as YYYY-MM-DD before shifting");
        let (new_date, reason) = shift_date(original_date, opts);
        match reason {
            Some(reason) => {
                movements.push(MovementRecord {
                    provider: inst.provider.clone(),
                    installment_no: inst.installment_no,
                    original_due_date: inst.due_date.clone(),
                    shifted_due_date: new_date.to_string(),
                    reason,
                });
                shifted.push(ShiftedInstallment {
                    installment: Installment {
                        due_date: new_date.to_string(),
                        ..inst.clone()
                    },
                    was_shifted: true,
                    original_due_date: Some(inst.due_date.clone()),
                    shift_reason: Some(reason),
                });
            }
            None => shifted.push(ShiftedInstallment {
                installment: inst.clone(),
                was_shifted: false,
                original_due_date: None,
                shift_reason: None,
            }),
        }
    }

    movements.sort_by(|a, b| {
        a.shifted_due_date
            .cmp(&b.shifted_due_date)
            .then_with(|| a.provider.cmp(&b.provider))
    });

    (shifted, movements)
}
