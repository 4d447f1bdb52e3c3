//! Field extractors: per-field regex-driven extraction from raw
//! email text. Each submodule exposes a single `extract` function that
//! returns the field value or a typed [`ExtractError`].

mod amount;
mod autopay;
mod currency;
mod due_date;
mod installment_no;
mod late_fee;

pub use amount::extract as extract_amount;
pub use autopay::extract as extract_autopay;
pub use currency::extract as extract_currency;
pub use due_date::extract as extract_due_date;
pub use installment_no::extract as extract_installment_no;
pub use late_fee::extract as extract_late_fee;

use thiserror::Error;

/// A single field extraction failure, aggregated by [`crate::extraction`]
/// into [`crate::model::ExtractionIssue`]s rather than surfaced directly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no {field} found in segment")]
    NotFound { field: &'static str },
    #[error("unsupported date format: {0}")]
    UnsupportedDateFormat(String),
    #[error("{field} value out of range: {detail}")]
    OutOfRange { field: &'static str, detail: String },
}
