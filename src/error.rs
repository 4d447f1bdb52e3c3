//! The error taxonomy surfaced across the planning API.
//!
//! Every error that can escape to an HTTP client is one of these variants.
//! Internal plumbing (extraction, shifting, projection) uses `anyhow::Result`
//! for composition and gets folded into `Internal` at the API boundary —
//! that boundary is the only place an error is allowed to lose detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::problem::{self, ProblemKind};

#[derive(Debug, Error)]
pub enum PayPlanError {
    #[error("validation failed for field `{field}`: {detail}")]
    Validation { field: String, detail: String },

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("idempotency key conflict: {detail}")]
    IdempotencyConflict { detail: String },

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("cache validation error: {0}")]
    CacheValidation(String),
}

impl PayPlanError {
    pub fn validation(field: impl Into<String>, detail: impl Into<String>) -> Self {
        PayPlanError::Validation {
            field: field.into(),
            detail: detail.into(),
        }
    }

    /// Never put raw error detail here when the source might contain client
    /// input; sanitize first (see [`crate::pii`]).
    pub fn internal(detail: impl Into<String>) -> Self {
        PayPlanError::Internal(detail.into())
    }

    fn kind(&self) -> ProblemKind {
        match self {
            PayPlanError::Validation { .. } => ProblemKind::Validation,
            PayPlanError::MethodNotAllowed => ProblemKind::MethodNotAllowed,
            PayPlanError::IdempotencyConflict { .. } => ProblemKind::IdempotencyKeyConflict,
            PayPlanError::RateLimited { .. } => ProblemKind::RateLimitExceeded,
            PayPlanError::Internal(_) | PayPlanError::CacheValidation(_) => ProblemKind::Internal,
        }
    }

    fn detail(&self) -> String {
        match self {
            PayPlanError::Validation { field, detail } => format!("{field}: {detail}"),
            PayPlanError::MethodNotAllowed => "this endpoint only accepts POST".to_string(),
            PayPlanError::IdempotencyConflict { detail } => detail.clone(),
            PayPlanError::RateLimited { .. } => "too many requests".to_string(),
            // Internal/CacheValidation details never reach the client verbatim.
            PayPlanError::Internal(_) => "an unexpected error occurred".to_string(),
            PayPlanError::CacheValidation(_) => "an unexpected error occurred".to_string(),
        }
    }
}

impl IntoResponse for PayPlanError {
    fn into_response(self) -> Response {
        if matches!(self, PayPlanError::Internal(_) | PayPlanError::CacheValidation(_)) {
            tracing::error!(error = %self, "internal error converted to problem details");
        }
        let retry_after = match &self {
            PayPlanError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };
        let kind = self.kind();
        let detail = self.detail();
        let pd = problem::build(kind, detail, None, None);
        let mut response = (StatusCode::from_u16(pd.status).unwrap(), pd).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert("Retry-After", secs.to_string().parse().unwrap());
        }
        response
    }
}
