//! The plan handler: the glue around the planning pipeline —
//! CORS, rate limiting, idempotency, validation, execution, and response
//! assembly.

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{post, MethodRouter};
use axum::{Json, Router};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::actions;
use crate::config::Settings;
use crate::date_time;
use crate::error::PayPlanError;
use crate::idempotency::{IdempotencyStore, LookupOutcome};
use crate::ics;
use crate::model::{Installment, MovementRecord, PayCadence, RiskFlag, ShiftedInstallment};
use crate::payday::{self, PaydaySource};
use crate::ratelimit::RateLimiter;
use crate::risk;
use crate::shifter::{self, Country, ShiftOptions};

const MAX_BODY_BYTES: usize = 1024 * 1024;

pub struct AppState {
    pub settings: Arc<Settings>,
    pub idempotency: IdempotencyStore,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(settings: Arc<Settings>) -> Self {
        let kv = settings.build_kv();
        let idempotency = IdempotencyStore::new(kv.clone(), settings.idempotency_ttl_secs);
        let rate_limiter = RateLimiter::new(
            kv,
            settings.rate_limit_per_hour,
            3600,
            settings.env.clone(),
        );
        AppState { settings, idempotency, rate_limiter }
    }
}

/// Build the Axum router: CORS and a request-body size cap wrap a single
/// `POST /api/plan` route. Non-POST methods on that path get an RFC 9457
/// 405, and `OPTIONS` preflight is answered by [`CorsLayer`] before it ever
/// reaches the handler.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            state
                .settings
                .cors_origin
                .parse::<HeaderValue>()
                .unwrap_or(HeaderValue::from_static("*")),
        )
        .allow_methods([axum::http::Method::POST, axum::http::Method::OPTIONS])
        .allow_headers(tower_http::cors::Any);

    let plan_route: MethodRouter<Arc<AppState>> = post(plan).fallback(method_not_allowed);

    Router::new()
        .route("/api/plan", plan_route)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn method_not_allowed() -> PayPlanError {
    PayPlanError::MethodNotAllowed
}

#[derive(Debug, Deserialize)]
struct RawInstallment {
    provider: String,
    installment_no: u32,
    due_date: String,
    amount: f64,
    #[serde(default = "default_currency")]
    currency: String,
    #[serde(default)]
    autopay: bool,
    #[serde(default)]
    late_fee: f64,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_true() -> bool {
    true
}

fn default_country() -> String {
    "US".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanRequestBody {
    items: Vec<RawInstallment>,
    #[serde(default)]
    paycheck_dates: Option<Vec<String>>,
    #[serde(default)]
    pay_cadence: Option<String>,
    #[serde(default)]
    next_payday: Option<String>,
    #[serde(default)]
    min_buffer: Option<f64>,
    time_zone: String,
    #[serde(default = "default_true")]
    business_day_mode: bool,
    #[serde(default = "default_country")]
    country: String,
    #[serde(default)]
    custom_skip_dates: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponseBody {
    summary: Vec<String>,
    actions_this_week: Vec<actions::Action>,
    risk_flags: Vec<RiskFlag>,
    ics: String,
    normalized: Vec<ShiftedInstallment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    moved_dates: Option<Vec<MovementRecord>>,
}

fn to_cents(dollars: f64) -> i64 {
    (dollars * 100.0).round() as i64
}

fn to_cents_u64(dollars: f64) -> u64 {
    (dollars * 100.0).round().max(0.0) as u64
}

fn client_identifier(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn rate_limit_headers(decision: &crate::ratelimit::RateLimitDecision) -> [(&'static str, String); 3] {
    [
        ("X-RateLimit-Limit", decision.limit.to_string()),
        ("X-RateLimit-Remaining", decision.remaining.to_string()),
        ("X-RateLimit-Reset", decision.reset_epoch_sec.to_string()),
    ]
}

fn parse_skip_dates(raw: &[String]) -> Result<HashSet<NaiveDate>, PayPlanError> {
    raw.iter()
        .map(|s| date_time::parse_date_multi(s).map(|p| p.date))
        .collect()
}

fn build_payday_source(body: &PlanRequestBody) -> Result<PaydaySource, PayPlanError> {
    match (&body.paycheck_dates, &body.pay_cadence, &body.next_payday) {
        (Some(dates), _, _) if !dates.is_empty() => {
            let parsed: Result<Vec<NaiveDate>, PayPlanError> =
                dates.iter().map(|s| date_time::parse_date_multi(s).map(|p| p.date)).collect();
            Ok(PaydaySource::Explicit(parsed?))
        }
        (None, Some(cadence), Some(next_payday)) => {
            let cadence = match cadence.as_str() {
                "weekly" => PayCadence::Weekly,
                "biweekly" => PayCadence::Biweekly,
                "semimonthly" => PayCadence::Semimonthly,
                "monthly" => PayCadence::Monthly,
                other => {
                    return Err(PayPlanError::validation(
                        "payCadence",
                        format!("'{other}' is not a supported cadence"),
                    ))
                }
            };
            let next_payday = date_time::parse_date_multi(next_payday)?.date;
            Ok(PaydaySource::Cadence { cadence, next_payday })
        }
        _ => Err(PayPlanError::validation(
            "paycheckDates",
            "either `paycheckDates` (>=3 dates) or `payCadence`+`nextPayday` is required",
        )),
    }
}

fn validate_and_normalize(body: &PlanRequestBody) -> Result<(Tz, Vec<Installment>, ShiftOptions, PaydaySource, i64), PayPlanError> {
    if body.items.is_empty() {
        return Err(PayPlanError::validation("items", "at least one installment is required"));
    }
    let tz = date_time::validate_timezone(&body.time_zone)?;
    let min_buffer_cents = match body.min_buffer {
        Some(v) if v < 0.0 => {
            return Err(PayPlanError::validation("minBuffer", "must be >= 0"));
        }
        Some(v) => to_cents(v),
        None => 0,
    };
    let country = match body.country.as_str() {
        "US" => Country::Us,
        "None" => Country::None,
        other => return Err(PayPlanError::validation("country", format!("'{other}' is not supported"))),
    };
    let custom_skip_dates = parse_skip_dates(&body.custom_skip_dates)?;
    let shift_opts = ShiftOptions {
        business_day_mode: body.business_day_mode,
        country,
        custom_skip_dates,
    };

    let mut installments = Vec::with_capacity(body.items.len());
    for raw in &body.items {
        let due_date = date_time::parse_date_multi(&raw.due_date)?.date;
        installments.push(Installment {
            provider: raw.provider.clone(),
            installment_no: raw.installment_no,
            due_date: due_date.to_string(),
            amount: to_cents(raw.amount),
            currency: raw.currency.clone(),
            autopay: raw.autopay,
            late_fee: to_cents_u64(raw.late_fee),
        });
    }

    let payday_source = build_payday_source(body)?;

    Ok((tz, installments, shift_opts, payday_source, min_buffer_cents))
}

/// Execute the planning pipeline end to end. Exposed separately from the
/// HTTP glue so tests (and any future non-HTTP caller) can drive it
/// directly.
pub fn run_plan(body_json: &Value) -> Result<Value, PayPlanError> {
    let body: PlanRequestBody = serde_json::from_value(body_json.clone())
        .map_err(|e| PayPlanError::validation("body", e.to_string()))?;

    let (tz, installments, shift_opts, payday_source, min_buffer_cents) = validate_and_normalize(&body)?;

    let (shifted, movements) = shifter::shift_all(&installments, &shift_opts);
    let paydays = payday::project(payday_source)?;
    let risk_flags = risk::detect(&shifted, &paydays, min_buffer_cents);

    let today = chrono::Utc::now().with_timezone(&tz).date_naive();
    let week_items = actions::filter_this_week(today, &shifted);
    let actions_list = actions::this_week(today, &shifted, &risk_flags);
    let summary = actions::summarize(&actions_list, &risk_flags);
    let ics_base64 = ics::build_calendar_base64(tz, &week_items, &risk_flags, true);

    let response = PlanResponseBody {
        summary,
        actions_this_week: actions_list,
        risk_flags,
        ics: ics_base64,
        normalized: shifted,
        moved_dates: if movements.is_empty() { None } else { Some(movements) },
    };

    serde_json::to_value(response).map_err(|e| PayPlanError::internal(e.to_string()))
}

pub async fn plan(State(state): State<Arc<AppState>>, headers: HeaderMap, uri: Uri, body: Bytes) -> Response {
    match plan_inner(state, headers, uri, body).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn plan_inner(state: Arc<AppState>, headers: HeaderMap, uri: Uri, body: Bytes) -> Result<Response, PayPlanError> {
    let instance = uri.path().to_string();
    let client_id = client_identifier(&headers);

    let decision = state.rate_limiter.check(&client_id).await;
    let rl_headers = rate_limit_headers(&decision);
    if !decision.allowed {
        let mut response = PayPlanError::RateLimited {
            retry_after_secs: decision.retry_after_sec.unwrap_or(1),
        }
        .into_response();
        apply_headers(&mut response, &rl_headers);
        return Ok(response);
    }

    let body_json: Value = serde_json::from_slice(&body)
        .map_err(|e| PayPlanError::validation("body", format!("invalid JSON: {e}")))?;

    let idempotency_key = headers
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let body_hash = IdempotencyStore::hash_body(&body_json);

    if let Some(ref key) = idempotency_key {
        match state.idempotency.lookup("POST", &instance, key, &body_hash).await? {
            LookupOutcome::Hit(cached) => {
                let mut response = (StatusCode::OK, Json(cached)).into_response();
                apply_headers(&mut response, &rl_headers);
                response
                    .headers_mut()
                    .insert("X-Idempotent-Replayed", HeaderValue::from_static("true"));
                return Ok(response);
            }
            LookupOutcome::Conflict => {
                let err = PayPlanError::IdempotencyConflict {
                    detail: format!(
                        "a different request body was already cached under this Idempotency-Key (TTL {}s)",
                        state.idempotency.ttl_secs()
                    ),
                };
                let mut response = err.into_response();
                apply_headers(&mut response, &rl_headers);
                return Ok(response);
            }
            LookupOutcome::Miss => {}
        }
    }

    let response_value = run_plan(&body_json)?;

    if let Some(ref key) = idempotency_key {
        state.idempotency.store("POST", &instance, key, &body_hash, &response_value).await;
    }

    let mut response = (StatusCode::OK, Json(response_value)).into_response();
    apply_headers(&mut response, &rl_headers);
    Ok(response)
}

fn apply_headers(response: &mut Response, headers: &[(&'static str, String)]) {
    for (name, value) in headers {
        if let Ok(value) = HeaderValue::from_str(value) {
            response.headers_mut().insert(*name, value);
        }
    }
}
