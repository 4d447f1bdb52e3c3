//! Risk detection: scans a shifted schedule against the
//! projected paydays and emits COLLISION, CASH_CRUNCH, WEEKEND_AUTOPAY, and
//! SHIFTED_NEXT_BUSINESS_DAY flags.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::model::{RiskFlag, RiskKind, Severity, ShiftReason, ShiftedInstallment};

const CASH_CRUNCH_WINDOW_DAYS: i64 = 3;
/// $250, in cents — the line between CASH_CRUNCH medium and high severity.
const CASH_CRUNCH_SEVERITY_THRESHOLD_CENTS: i64 = 25_000;

fn parse(date: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("due_date is validated as YYYY-MM-DD")
}

fn detect_collisions(items: &[ShiftedInstallment]) -> Vec<RiskFlag> {
    let mut by_date: HashMap<&str, Vec<(&str, u32)>> = HashMap::new();
    for item in items {
        by_date
            .entry(item.installment.due_date.as_str())
            .or_default()
            .push((item.installment.provider.as_str(), item.installment.installment_no));
    }
    let mut flags: Vec<RiskFlag> = by_date
        .into_iter()
        .filter(|(_, group)| group.len() >= 2)
        .map(|(date, group)| {
            let severity = if group.len() >= 3 { Severity::High } else { Severity::Medium };
            let providers: Vec<String> = group.iter().map(|(p, n)| format!("{p} #{n}")).collect();
            RiskFlag {
                kind: RiskKind::Collision,
                severity,
                affected: group.iter().map(|(p, n)| (p.to_string(), *n)).collect(),
                message: format!("{} payments are due on {date}: {}", group.len(), providers.join(", ")),
            }
        })
        .collect();
    flags.sort_by_key(|f| collision_sort_date(f, items));
    flags
}

fn collision_sort_date(flag: &RiskFlag, items: &[ShiftedInstallment]) -> String {
    let (provider, no) = &flag.affected[0];
    items
        .iter()
        .find(|i| &i.installment.provider == provider && i.installment.installment_no == *no)
        .map(|i| i.installment.due_date.clone())
        .unwrap_or_default()
}

/// Cash-crunch windows are keyed by payday so overlapping ±3-day windows
/// from adjacent paydays don't double-count a payment; each projected
/// payday's buffer is evaluated independently.
fn detect_cash_crunch(
    items: &[ShiftedInstallment],
    paydays: &[NaiveDate],
    min_buffer_cents: i64,
) -> Vec<RiskFlag> {
    let mut flags = Vec::new();
    for &payday in paydays {
        let window_start = payday - chrono::Duration::days(CASH_CRUNCH_WINDOW_DAYS);
        let window_end = payday + chrono::Duration::days(CASH_CRUNCH_WINDOW_DAYS);
        let mut total: i64 = 0;
        let mut affected = Vec::new();
        for item in items {
            let due = parse(&item.installment.due_date);
            if due >= window_start && due <= window_end && item.installment.amount > 0 {
                total += item.installment.amount;
                affected.push((item.installment.provider.clone(), item.installment.installment_no));
            }
        }
        if total > min_buffer_cents {
            let overage = total - min_buffer_cents;
            let severity = if overage < CASH_CRUNCH_SEVERITY_THRESHOLD_CENTS {
                Severity::Medium
            } else {
                Severity::High
            };
            flags.push(RiskFlag {
                kind: RiskKind::CashCrunch,
                severity,
                affected,
                message: format!(
                    "payments totaling ${:.2} fall within 3 days of your {} payday, ${:.2} over your buffer",
                    total as f64 / 100.0,
                    payday,
                    overage as f64 / 100.0
                ),
            });
        }
    }
    flags
}

fn detect_weekend_autopay(items: &[ShiftedInstallment]) -> Vec<RiskFlag> {
    items
        .iter()
        .filter(|item| {
            if !item.installment.autopay {
                return false;
            }
            if item.shift_reason == Some(ShiftReason::Weekend) {
                return false;
            }
            let unshifted = item
                .original_due_date
                .as_deref()
                .unwrap_or(&item.installment.due_date);
            matches!(parse(unshifted).weekday(), Weekday::Sat | Weekday::Sun)
        })
        .map(|item| RiskFlag {
            kind: RiskKind::WeekendAutopay,
            severity: Severity::Medium,
            affected: vec![(item.installment.provider.clone(), item.installment.installment_no)],
            message: format!(
                "{} installment #{} is set to autopay on a weekend due date",
                item.installment.provider, item.installment.installment_no
            ),
        })
        .collect()
}

fn detect_shifted(items: &[ShiftedInstallment]) -> Vec<RiskFlag> {
    items
        .iter()
        .filter(|item| item.was_shifted)
        .map(|item| RiskFlag {
            kind: RiskKind::ShiftedNextBusinessDay,
            severity: Severity::Info,
            affected: vec![(item.installment.provider.clone(), item.installment.installment_no)],
            message: format!(
                "{} installment #{} was moved from {} to {}",
                item.installment.provider,
                item.installment.installment_no,
                item.original_due_date.as_deref().unwrap_or(""),
                item.installment.due_date
            ),
        })
        .collect()
}

/// Run every detector and return flags ordered high → medium → low → info,
/// stable within a severity tier by affected `due_date`.
pub fn detect(
    items: &[ShiftedInstallment],
    paydays: &[NaiveDate],
    min_buffer_cents: i64,
) -> Vec<RiskFlag> {
    let mut flags = Vec::new();
    flags.extend(detect_collisions(items));
    flags.extend(detect_cash_crunch(items, paydays, min_buffer_cents));
    flags.extend(detect_weekend_autopay(items));
    flags.extend(detect_shifted(items));

    let due_date_of = |flag: &RiskFlag| -> String {
        let (provider, no) = &flag.affected[0];
        items
            .iter()
            .find(|i| &i.installment.provider == provider && i.installment.installment_no == *no)
            .map(|i| i.installment.due_date.clone())
            .unwrap_or_default()
    };

    flags.sort_by(|a, b| {
        // Severity::High..Info is declared ascending (Info < Low < Medium < High),
        // so reverse the comparison to get high-first ordering.
        b.severity.cmp(&a.severity).then_with(|| due_date_of(a).cmp(&due_date_of(b)))
    });
    flags
}

#[cfg(test)]
mod test {
    use super::*;

    fn item(provider: &str, no: u32, due_date: &str, amount: i64, autopay: bool) -> ShiftedInstallment {
        use crate::model::Installment;
        ShiftedInstallment {
            installment: Installment {
                provider: provider.to_string(),
                installment_no: no,
                due_date: due_date.to_string(),
                amount,
                currency: "USD".to_string(),
                autopay,
                late_fee: 0,
            },
            was_shifted: false,
            original_due_date: None,
            shift_reason: None,
        }
    }

    #[test]
    fn collision_detected_for_two_items_same_date() {
        let items = vec![
            item("Affirm", 1, "2025-10-02", 5800, false),
            item("Klarna", 1, "2025-10-02", 4500, false),
        ];
        let flags = detect(&items, &[], 0);
        let collisions: Vec<_> = flags.iter().filter(|f| f.kind == RiskKind::Collision).collect();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].severity, Severity::Medium);
    }

    #[test]
    fn collision_is_high_severity_at_three_or_more() {
        let items = vec![
            item("Affirm", 1, "2025-10-02", 5800, false),
            item("Klarna", 1, "2025-10-02", 4500, false),
            item("Zip", 1, "2025-10-02", 3000, false),
        ];
        let flags = detect(&items, &[], 0);
        let collision = flags.iter().find(|f| f.kind == RiskKind::Collision).unwrap();
        assert_eq!(collision.severity, Severity::High);
    }

    #[test]
    fn cash_crunch_fires_when_window_total_exceeds_buffer() {
        let items = vec![item("Klarna", 1, "2025-10-04", 30_000, false)];
        let paydays = vec![NaiveDate::from_ymd_opt(2025, 10, 5).unwrap()];
        let flags = detect(&items, &paydays, 20_000);
        assert!(flags.iter().any(|f| f.kind == RiskKind::CashCrunch));
    }

    #[test]
    fn cash_crunch_ignores_negative_refund_amounts() {
        let items = vec![item("Klarna", 1, "2025-10-04", -30_000, false)];
        let paydays = vec![NaiveDate::from_ymd_opt(2025, 10, 5).unwrap()];
        let flags = detect(&items, &paydays, 0);
        assert!(!flags.iter().any(|f| f.kind == RiskKind::CashCrunch));
    }

    #[test]
    fn weekend_autopay_fires_when_unshifted_and_autopay_on() {
        let items = vec![item("Afterpay", 1, "2025-10-05", 3250, true)]; // Sunday
        let flags = detect(&items, &[], 0);
        assert!(flags.iter().any(|f| f.kind == RiskKind::WeekendAutopay));
    }

    #[test]
    fn weekend_autopay_suppressed_when_shifted_for_weekend_reason() {
        let mut shifted = item("Afterpay", 1, "2025-10-06", 3250, true);
        shifted.was_shifted = true;
        shifted.original_due_date = Some("2025-10-05".to_string());
        shifted.shift_reason = Some(ShiftReason::Weekend);
        let flags = detect(&[shifted], &[], 0);
        assert!(!flags.iter().any(|f| f.kind == RiskKind::WeekendAutopay));
        assert!(flags.iter().any(|f| f.kind == RiskKind::ShiftedNextBusinessDay));
    }

    #[test]
    fn flags_ordered_high_before_medium_before_info() {
        let collision_a = item("Affirm", 1, "2025-10-02", 5800, false);
        let collision_b = item("Klarna", 1, "2025-10-02", 4500, false);
        let collision_c = item("Zip", 1, "2025-10-02", 3000, false);
        let mut shifted = item("Sezzle", 1, "2025-10-06", 1000, false);
        shifted.was_shifted = true;
        shifted.original_due_date = Some("2025-10-05".to_string());
        shifted.shift_reason = Some(ShiftReason::Weekend);
        let items = vec![collision_a, collision_b, collision_c, shifted];
        let flags = detect(&items, &[], 0);
        let severities: Vec<Severity> = flags.iter().map(|f| f.severity).collect();
        for w in severities.windows(2) {
            assert!(w[0] >= w[1], "flags must be sorted from highest to lowest severity");
        }
    }
}
