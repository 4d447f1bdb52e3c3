//! Action prioritization and summary generation.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::date_time::iso_week_bounds;
use crate::model::{RiskFlag, Severity, ShiftedInstallment};

/// One line of the "this week" action list.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Action {
    pub provider: String,
    pub installment_no: u32,
    pub due_date: String,
    pub line: String,
}

fn dollars(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// The subset of `items` whose (shifted) `due_date` falls in the ISO week
/// (Mon–Sun) containing `today` — the selection shared by the "this week"
/// action list and the "This Week" ICS export.
pub fn filter_this_week(today: NaiveDate, items: &[ShiftedInstallment]) -> Vec<ShiftedInstallment> {
    let (week_start, week_end) = iso_week_bounds(today);
    items
        .iter()
        .filter(|i| {
            let due = NaiveDate::parse_from_str(&i.installment.due_date, "%Y-%m-%d")
                .expect("due_date is validated as YYYY-MM-DD");
            due >= week_start && due <= week_end
        })
        .cloned()
        .collect()
}

/// Select the installments whose (shifted) `due_date` falls in the ISO week
/// (Mon–Sun) containing `today`, sorted by `late_fee` desc then `amount`
/// asc, and render one line per action.
pub fn this_week(today: NaiveDate, items: &[ShiftedInstallment], risks: &[RiskFlag]) -> Vec<Action> {
    let mut selected = filter_this_week(today, items);

    selected.sort_by(|a, b| {
        b.installment
            .late_fee
            .cmp(&a.installment.late_fee)
            .then_with(|| a.installment.amount.cmp(&b.installment.amount))
    });

    selected
        .into_iter()
        .map(|item| {
            let risk_note = risks
                .iter()
                .find(|r| {
                    r.affected
                        .iter()
                        .any(|(p, n)| *p == item.installment.provider && *n == item.installment.installment_no)
                })
                .map(|r| format!(" [{}]", r.kind_label()));
            let line = format!(
                "{} payment #{} of ${} due {}{}",
                item.installment.provider,
                item.installment.installment_no,
                dollars(item.installment.amount),
                item.installment.due_date,
                risk_note.unwrap_or_default(),
            );
            Action {
                provider: item.installment.provider.clone(),
                installment_no: item.installment.installment_no,
                due_date: item.installment.due_date.clone(),
                line,
            }
        })
        .collect()
}

impl crate::model::RiskFlag {
    fn kind_label(&self) -> &'static str {
        use crate::model::RiskKind::*;
        match self.kind {
            Collision => "COLLISION",
            CashCrunch => "CASH_CRUNCH",
            WeekendAutopay => "WEEKEND_AUTOPAY",
            ShiftedNextBusinessDay => "SHIFTED",
        }
    }
}

/// Render risk flags as display strings prefixed with their severity.
pub fn format_risk_flags(risks: &[RiskFlag]) -> Vec<String> {
    risks
        .iter()
        .map(|r| {
            let prefix = match r.severity {
                Severity::High => "HIGH",
                Severity::Medium => "MEDIUM",
                Severity::Low => "LOW",
                Severity::Info => "INFO",
            };
            format!("[{prefix}] {}", r.message)
        })
        .collect()
}

/// Produce a 3–8 bullet summary of the plan: one line per "this week"
/// action (capped), followed by any risk flags that didn't already have
/// room, until the bullet budget is either exhausted or the content runs
/// out — never padded below 3 with filler.
pub fn summarize(actions: &[Action], risks: &[RiskFlag]) -> Vec<String> {
    const MIN_BULLETS: usize = 3;
    const MAX_BULLETS: usize = 8;

    let mut bullets: Vec<String> = Vec::new();

    if actions.is_empty() {
        bullets.push("No installments are due this week.".to_string());
    } else {
        bullets.push(format!(
            "{} installment{} due this week.",
            actions.len(),
            if actions.len() == 1 { "" } else { "s" }
        ));
        for action in actions.iter().take(MAX_BULLETS - 1) {
            bullets.push(action.line.clone());
        }
    }

    for risk in format_risk_flags(risks) {
        if bullets.len() >= MAX_BULLETS {
            break;
        }
        bullets.push(risk);
    }

    while bullets.len() < MIN_BULLETS {
        bullets.push("No further risks detected for this plan.".to_string());
    }

    bullets
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{Installment, RiskKind};

    fn shifted(provider: &str, no: u32, due: &str, amount: i64, late_fee: u64) -> ShiftedInstallment {
        ShiftedInstallment {
            installment: Installment {
                provider: provider.to_string(),
                installment_no: no,
                due_date: due.to_string(),
                amount,
                currency: "USD".to_string(),
                autopay: false,
                late_fee,
            },
            was_shifted: false,
            original_due_date: None,
            shift_reason: None,
        }
    }

    #[test]
    fn selects_only_items_within_current_iso_week() {
        // 2025-10-02 is a Thursday; week is 2025-09-29..2025-10-05.
        let today = NaiveDate::from_ymd_opt(2025, 10, 2).unwrap();
        let items = vec![
            shifted("Klarna", 1, "2025-10-02", 4500, 700),
            shifted("Affirm", 1, "2025-10-20", 5800, 1500),
        ];
        let actions = this_week(today, &items, &[]);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].provider, "Klarna");
    }

    #[test]
    fn sorted_by_late_fee_desc_then_amount_asc() {
        let today = NaiveDate::from_ymd_opt(2025, 10, 2).unwrap();
        let items = vec![
            shifted("Klarna", 1, "2025-10-02", 4500, 700),
            shifted("Affirm", 1, "2025-10-02", 5800, 1500),
        ];
        let actions = this_week(today, &items, &[]);
        assert_eq!(actions[0].provider, "Affirm");
        assert_eq!(actions[1].provider, "Klarna");
    }

    #[test]
    fn summary_has_between_three_and_eight_bullets() {
        let today = NaiveDate::from_ymd_opt(2025, 10, 2).unwrap();
        let items = vec![shifted("Klarna", 1, "2025-10-02", 4500, 700)];
        let actions = this_week(today, &items, &[]);
        let summary = summarize(&actions, &[]);
        assert!(summary.len() >= 3 && summary.len() <= 8);
    }

    #[test]
    fn summary_is_not_padded_with_filler_when_content_exists() {
        let today = NaiveDate::from_ymd_opt(2025, 10, 2).unwrap();
        let items = vec![shifted("Klarna", 1, "2025-10-02", 4500, 700)];
        let actions = this_week(today, &items, &[]);
        let risks = vec![RiskFlag {
            kind: RiskKind::WeekendAutopay,
            severity: Severity::Medium,
            affected: vec![("Klarna".to_string(), 1)],
            message: "Klarna installment #1 is set to autopay on a weekend due date".to_string(),
        }];
        let summary = summarize(&actions, &risks);
        assert!(!summary.iter().any(|b| b.contains("No further risks")));
    }
}
