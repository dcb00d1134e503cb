use axum::http::StatusCode;
use serde_json::json;
use serial_test::serial;

use crate::common::{test_email, test_meter, test_password, test_phone, TestContext, TEST_OTP};

#[tokio::test]
#[serial]
async fn otp_gated_phone_change_updates_account_and_consumer_together() {
    let ctx = TestContext::new().await;
    let meter = test_meter();
    let token = ctx
        .register_account(&meter, &test_phone(), &test_email(), test_password())
        .await;

    let new_phone = test_phone();
    let canonical = format!("+91{new_phone}");

    ctx.server
        .post("/user/profile/phone/send-otp")
        .authorization_bearer(&token)
        .json(&json!({ "phone": &new_phone }))
        .await
        .assert_status(StatusCode::OK);

    ctx.server
        .post("/auth/verify-otp")
        .json(&json!({ "phone": &new_phone, "code": TEST_OTP, "flow": "phone_change" }))
        .await
        .assert_status(StatusCode::OK);

    let response = ctx
        .server
        .put("/user/profile/phone")
        .authorization_bearer(&token)
        .json(&json!({ "phone": &new_phone }))
        .await;
    response.assert_status(StatusCode::OK);

    // Both tables must show the new phone to any subsequent reader.
    let profile = ctx
        .server
        .get("/user/profile")
        .authorization_bearer(&token)
        .await;
    let body: serde_json::Value = profile.json();
    assert_eq!(body["phone"], canonical);

    let (consumer_phone,): (String,) =
        sqlx::query_as("SELECT phone FROM eb_consumers WHERE meter_id = ?")
            .bind(&meter)
            .fetch_one(&ctx.db)
            .await
            .unwrap();
    assert_eq!(consumer_phone, canonical);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn change_without_otp_confirmation_is_forbidden() {
    let ctx = TestContext::new().await;
    let token = ctx
        .register_account(&test_meter(), &test_phone(), &test_email(), test_password())
        .await;

    let response = ctx
        .server
        .put("/user/profile/phone")
        .authorization_bearer(&token)
        .json(&json!({ "phone": test_phone() }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn a_confirmation_authorizes_exactly_one_phone_write() {
    let ctx = TestContext::new().await;
    let token = ctx
        .register_account(&test_meter(), &test_phone(), &test_email(), test_password())
        .await;

    let new_phone = test_phone();
    ctx.approve_phone("phone_change", &format!("+91{new_phone}"))
        .await;

    ctx.server
        .put("/user/profile/phone")
        .authorization_bearer(&token)
        .json(&json!({ "phone": &new_phone }))
        .await
        .assert_status(StatusCode::OK);

    // The marker is consumed; replaying the write is refused.
    let replay = ctx
        .server
        .put("/user/profile/phone")
        .authorization_bearer(&token)
        .json(&json!({ "phone": test_phone() }))
        .await;
    replay.assert_status(StatusCode::FORBIDDEN);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn current_phone_is_rejected_before_any_provider_call() {
    let ctx = TestContext::new().await;
    let phone = test_phone();
    let token = ctx
        .register_account(&test_meter(), &phone, &test_email(), test_password())
        .await;

    let response = ctx
        .server
        .post("/user/profile/phone/send-otp")
        .authorization_bearer(&token)
        .json(&json!({ "phone": &phone }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "This is already your current phone number");

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn phone_held_by_another_account_is_a_conflict() {
    let ctx = TestContext::new().await;
    let other_phone = test_phone();

    ctx.register_account(&test_meter(), &other_phone, &test_email(), test_password())
        .await;
    let token = ctx
        .register_account(&test_meter(), &test_phone(), &test_email(), test_password())
        .await;

    ctx.approve_phone("phone_change", &format!("+91{other_phone}"))
        .await;

    let response = ctx
        .server
        .put("/user/profile/phone")
        .authorization_bearer(&token)
        .json(&json!({ "phone": format!("+91{other_phone}") }))
        .await;

    response.assert_status(StatusCode::CONFLICT);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn malformed_phone_is_rejected() {
    let ctx = TestContext::new().await;
    let token = ctx
        .register_account(&test_meter(), &test_phone(), &test_email(), test_password())
        .await;

    let response = ctx
        .server
        .put("/user/profile/phone")
        .authorization_bearer(&token)
        .json(&json!({ "phone": "12345" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    ctx.cleanup().await;
}
