//! Shared domain types for the planning pipeline.
//!
//! These cross-cut several extraction and planning modules, so they live in
//! one place rather than being duplicated or re-exported awkwardly from
//! whichever module happens to construct them first.

use serde::{Deserialize, Serialize};

/// An installment in canonical form, amounts in integer cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    pub provider: String,
    pub installment_no: u32,
    /// `YYYY-MM-DD`, already resolved in the request's timezone.
    pub due_date: String,
    /// Integer cents. Signed: a negative amount is a refund (see
    /// [`crate::risk`] for how cash-crunch detection treats these;
    /// rationale recorded in DESIGN.md).
    pub amount: i64,
    pub currency: String,
    pub autopay: bool,
    /// Integer cents, ≥ 0.
    pub late_fee: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShiftReason {
    Weekend,
    Holiday,
    Custom,
}

/// An [`Installment`] after business-day shifting. `due_date`
/// is the shifted date; `original_due_date` is only present when a shift
/// occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftedInstallment {
    #[serde(flatten)]
    pub installment: Installment,
    #[serde(rename = "wasShifted")]
    pub was_shifted: bool,
    #[serde(rename = "originalDueDate", skip_serializing_if = "Option::is_none")]
    pub original_due_date: Option<String>,
    #[serde(rename = "shiftReason", skip_serializing_if = "Option::is_none")]
    pub shift_reason: Option<ShiftReason>,
}

/// One shifted item, reported separately from the normalized schedule so
/// clients can render a "moved dates" summary without re-deriving it.
///
/// Field casing intentionally mirrors the planning specification's data
/// model verbatim: `provider`/`installment_no`/`reason` stay snake_case like
/// [`Installment`], while `originalDueDate`/`shiftedDueDate` are camelCase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub provider: String,
    pub installment_no: u32,
    #[serde(rename = "originalDueDate")]
    pub original_due_date: String,
    #[serde(rename = "shiftedDueDate")]
    pub shifted_due_date: String,
    pub reason: ShiftReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskKind {
    Collision,
    CashCrunch,
    WeekendAutopay,
    ShiftedNextBusinessDay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFlag {
    pub kind: RiskKind,
    pub severity: Severity,
    /// `(provider, installment_no)` pairs this flag concerns.
    pub affected: Vec<(String, u32)>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayCadence {
    Weekly,
    Biweekly,
    Semimonthly,
    Monthly,
}

/// One request-scoped extraction confidence bucket; the numeric score itself
/// is carried on [`ExtractionItem`] and bucketed by the caller/UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBucket {
    High,
    Medium,
    Low,
}

impl ConfidenceBucket {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.80 {
            ConfidenceBucket::High
        } else if score >= 0.60 {
            ConfidenceBucket::Medium
        } else {
            ConfidenceBucket::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionItem {
    #[serde(flatten)]
    pub installment: Installment,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionIssue {
    /// PII-redacted, ≤200 chars (see [`crate::pii::redact_snippet`]).
    pub snippet: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}
