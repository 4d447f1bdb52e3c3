//! End-to-end scenarios exercising `handler::run_plan` and the full Axum
//! router, mirroring the seed scenarios in the planning specification's
//! testable-properties section.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use payplan::config::Settings;
use payplan::handler::{router, AppState};

fn test_settings() -> Arc<Settings> {
    Arc::new(Settings {
        rate_limit_per_hour: 60,
        idempotency_ttl_secs: 86_400,
        cors_origin: "*".to_string(),
        env: "test".to_string(),
        log_format: payplan::config::LogFormat::Pretty,
        bind_addr: "127.0.0.1:0".to_string(),
    })
}

fn app() -> axum::Router {
    router(Arc::new(AppState::new(test_settings())))
}

fn post_request(body: Value, idempotency_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/plan")
        .header("content-type", "application/json");
    if let Some(key) = idempotency_key {
        builder = builder.header("Idempotency-Key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn klarna_pay_in_4() -> Value {
    json!({
        "items": [
            {"provider": "Klarna", "installment_no": 1, "due_date": "2025-10-02", "amount": 45.0, "currency": "USD", "autopay": true, "late_fee": 7.0},
            {"provider": "Klarna", "installment_no": 2, "due_date": "2025-10-16", "amount": 45.0, "currency": "USD", "autopay": true, "late_fee": 7.0},
            {"provider": "Klarna", "installment_no": 3, "due_date": "2025-10-30", "amount": 45.0, "currency": "USD", "autopay": true, "late_fee": 7.0},
            {"provider": "Klarna", "installment_no": 4, "due_date": "2025-11-13", "amount": 45.0, "currency": "USD", "autopay": true, "late_fee": 7.0}
        ],
        "paycheckDates": ["2025-10-05", "2025-10-19", "2025-11-02"],
        "minBuffer": 200.0,
        "timeZone": "America/New_York"
    })
}

#[test]
fn s1_klarna_pay_in_4_has_no_moved_dates_and_no_weekend_autopay() {
    let result = payplan::handler::run_plan(&klarna_pay_in_4()).unwrap();
    assert!(result.get("movedDates").is_none());
    let risk_flags = result["riskFlags"].as_array().unwrap();
    assert!(!risk_flags.iter().any(|f| f["kind"] == "WEEKEND_AUTOPAY"));
    let ics = result["ics"].as_str().unwrap();
    assert!(!ics.is_empty());
    use base64::Engine;
    let decoded = base64::engine::general_purpose::STANDARD.decode(ics).unwrap();
    let text = String::from_utf8(decoded).unwrap();
    assert!(text.starts_with("BEGIN:VCALENDAR"));
}

#[test]
fn s2_mixed_providers_collision_and_weekend_shift() {
    let body = json!({
        "items": [
            {"provider": "Affirm", "installment_no": 1, "due_date": "2025-10-02", "amount": 58.0, "late_fee": 15.0},
            {"provider": "Klarna", "installment_no": 1, "due_date": "2025-10-02", "amount": 45.0, "late_fee": 7.0},
            {"provider": "Afterpay", "installment_no": 1, "due_date": "2025-10-05", "amount": 32.50, "autopay": true}
        ],
        "paycheckDates": ["2025-10-05", "2025-10-19", "2025-11-02"],
        "minBuffer": 200.0,
        "timeZone": "America/New_York"
    });
    let result = payplan::handler::run_plan(&body).unwrap();

    let risk_flags = result["riskFlags"].as_array().unwrap();
    assert!(risk_flags.iter().any(|f| f["kind"] == "COLLISION"));
    assert!(!risk_flags.iter().any(|f| f["kind"] == "WEEKEND_AUTOPAY"));

    let moved = result["movedDates"].as_array().unwrap();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0]["shiftedDueDate"], "2025-10-06");

    // `actionsThisWeek` selection depends on the real-world current date
    // (it's measured against the actual request-time ISO week), so a
    // fixture pinned to 2025 dates is exercised for ordering separately in
    // `actions::test::sorted_by_late_fee_desc_then_amount_asc` against an
    // explicit `today`, rather than here against whatever day the test
    // suite happens to run on.
}

#[test]
fn s3_thanksgiving_holiday_shift() {
    let body = json!({
        "items": [
            {"provider": "Klarna", "installment_no": 1, "due_date": "2025-11-27", "amount": 45.0}
        ],
        "paycheckDates": ["2025-11-05", "2025-11-19", "2025-12-03"],
        "minBuffer": 0.0,
        "timeZone": "America/New_York"
    });
    let result = payplan::handler::run_plan(&body).unwrap();

    let moved = result["movedDates"].as_array().unwrap();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0]["reason"], "HOLIDAY");
    assert_eq!(moved[0]["shiftedDueDate"], "2025-11-28");

    let risk_flags = result["riskFlags"].as_array().unwrap();
    assert!(risk_flags.iter().any(|f| f["kind"] == "SHIFTED_NEXT_BUSINESS_DAY"));
}

#[tokio::test]
async fn s4_idempotency_replay_then_conflict() {
    let app = app();

    let first = app.clone().oneshot(post_request(klarna_pay_in_4(), Some("k1"))).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first_body = body_json(first).await;

    let second = app.clone().oneshot(post_request(klarna_pay_in_4(), Some("k1"))).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers().get("X-Idempotent-Replayed").unwrap(), "true");
    let second_body = body_json(second).await;
    assert_eq!(first_body, second_body);

    let mut different = klarna_pay_in_4();
    different["minBuffer"] = json!(999.0);
    let third = app.clone().oneshot(post_request(different, Some("k1"))).await.unwrap();
    assert_eq!(third.status(), StatusCode::CONFLICT);
    let problem = body_json(third).await;
    assert_eq!(problem["status"], 409);
}

#[tokio::test]
async fn s5_rate_limiting_denies_after_limit() {
    let settings = Arc::new(Settings {
        rate_limit_per_hour: 2,
        ..(*test_settings()).clone()
    });
    let app = router(Arc::new(AppState::new(settings)));

    let first = app.clone().oneshot(post_request(klarna_pay_in_4(), None)).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first_remaining: u32 = first.headers().get("X-RateLimit-Remaining").unwrap().to_str().unwrap().parse().unwrap();

    let second = app.clone().oneshot(post_request(klarna_pay_in_4(), None)).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second_remaining: u32 = second.headers().get("X-RateLimit-Remaining").unwrap().to_str().unwrap().parse().unwrap();
    assert!(second_remaining < first_remaining);

    let third = app.clone().oneshot(post_request(klarna_pay_in_4(), None)).await.unwrap();
    assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(third.headers().get("Retry-After").is_some());
}

#[tokio::test]
async fn non_post_method_returns_problem_details_405() {
    let app = app();
    let request = Request::builder()
        .method("GET")
        .uri("/api/plan")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let problem = body_json(response).await;
    assert_eq!(problem["status"], 405);
}

#[tokio::test]
async fn malformed_json_body_returns_400_validation_problem() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/plan")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn pasted_email_text_sample_is_present_for_future_extraction_wiring() {
    let sample = indoc! {"
        From: billing@klarna.com
        Your payment 1 of 4 of $45.00 is due 2025-10-02. Autopay is on.
    "};
    let result = payplan::extraction::extract_all(sample, chrono_tz::Tz::UTC);
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].installment.provider, "Klarna");
}
