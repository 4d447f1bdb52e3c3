//! RFC 9457 Problem Details construction.

use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    Validation,
    MethodNotAllowed,
    IdempotencyKeyConflict,
    RateLimitExceeded,
    Internal,
}

impl ProblemKind {
    pub fn status(self) -> u16 {
        match self {
            ProblemKind::Validation => 400,
            ProblemKind::MethodNotAllowed => 405,
            ProblemKind::IdempotencyKeyConflict => 409,
            ProblemKind::RateLimitExceeded => 429,
            ProblemKind::Internal => 500,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ProblemKind::Validation => "Validation Error",
            ProblemKind::MethodNotAllowed => "Method Not Allowed",
            ProblemKind::IdempotencyKeyConflict => "Idempotency Key Conflict",
            ProblemKind::RateLimitExceeded => "Rate Limit Exceeded",
            ProblemKind::Internal => "Internal Error",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            ProblemKind::Validation => "validation-error",
            ProblemKind::MethodNotAllowed => "method-not-allowed",
            ProblemKind::IdempotencyKeyConflict => "idempotency-key-conflict",
            ProblemKind::RateLimitExceeded => "rate-limit-exceeded",
            ProblemKind::Internal => "internal-error",
        }
    }
}

/// The wire shape of an RFC 9457 problem response.
#[derive(Debug, Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub type_: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub instance: String,
}

/// Build a problem details body. `instance` defaults to `"/api/plan"` and
/// `host` defaults to `"payplan.invalid"` when not supplied by the caller
/// (e.g. when an error is converted outside of a live request context).
pub fn build(
    kind: ProblemKind,
    detail: impl Into<String>,
    instance: Option<&str>,
    host: Option<&str>,
) -> ProblemDetails {
    let host = host.unwrap_or("payplan.invalid");
    ProblemDetails {
        type_: format!("https://{host}/problems/{}", kind.slug()),
        title: kind.title().to_string(),
        status: kind.status(),
        detail: detail.into(),
        instance: instance.unwrap_or("/api/plan").to_string(),
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        let status = axum::http::StatusCode::from_u16(self.status)
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, axum::Json(self)).into_response();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, "application/problem+json".parse().unwrap());
        response
    }
}
