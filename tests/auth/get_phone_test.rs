use axum::http::StatusCode;
use serde_json::json;
use serial_test::serial;

use crate::common::{test_meter, test_phone, TestContext};

#[tokio::test]
#[serial]
async fn resolves_unregistered_consumer_to_canonical_phone() {
    let ctx = TestContext::new().await;
    let meter = test_meter();
    let phone = test_phone();

    // No portal account exists yet; the consumer alone must resolve.
    ctx.seed_consumer(&meter, &phone).await;

    let response = ctx
        .server
        .post("/auth/get-phone")
        .json(&json!({ "identifier": &meter }))
        .await;

    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    assert_eq!(body["phone"], format!("+91{phone}"));

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn tolerates_formatting_noise_in_the_identifier() {
    let ctx = TestContext::new().await;
    let phone = test_phone();
    ctx.seed_consumer(&test_meter(), &phone).await;

    let noisy = format!("0{} {}-{}", &phone[..4], &phone[4..7], &phone[7..]);

    let response = ctx
        .server
        .post("/auth/get-phone")
        .json(&json!({ "identifier": noisy }))
        .await;

    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    assert_eq!(body["phone"], format!("+91{phone}"));

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn unknown_identifier_returns_not_found() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/auth/get-phone")
        .json(&json!({ "identifier": "EB99999999" }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn empty_identifier_returns_bad_request() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/auth/get-phone")
        .json(&json!({ "identifier": "" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn malformed_phone_shaped_identifier_is_a_client_error() {
    let ctx = TestContext::new().await;

    // Wrong digit count: a caller mistake, not a missing record.
    let response = ctx
        .server
        .post("/auth/get-phone")
        .json(&json!({ "identifier": "98765 4321" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn unusable_stored_phone_is_a_server_error() {
    let ctx = TestContext::new().await;
    let meter = test_meter();

    sqlx::query(
        "INSERT INTO eb_consumers (meter_id, phone, consumer_type, status) VALUES (?, '12345', 'DOMESTIC', 'ACTIVE')",
    )
    .bind(&meter)
    .execute(&ctx.db)
    .await
    .unwrap();

    let response = ctx
        .server
        .post("/auth/get-phone")
        .json(&json!({ "identifier": &meter }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Invalid phone format in database");

    ctx.cleanup().await;
}
