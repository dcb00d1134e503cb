use axum::http::StatusCode;
use serde_json::json;
use serial_test::serial;

use crate::common::{test_email, test_meter, test_password, test_phone, TestContext};

#[tokio::test]
#[serial]
async fn reset_with_confirmed_otp_changes_the_password() {
    let ctx = TestContext::new().await;
    let phone = test_phone();
    let email = test_email();

    ctx.register_account(&test_meter(), &phone, &email, test_password())
        .await;
    ctx.approve_phone("password_reset", &format!("+91{phone}"))
        .await;

    let response = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({
            "identifier": &email,
            "password": "NewPassword456!"
        }))
        .await;

    response.assert_status(StatusCode::OK);

    let old_login = ctx
        .server
        .post("/auth/login")
        .json(&json!({ "identifier": &email, "password": test_password() }))
        .await;
    old_login.assert_status(StatusCode::UNAUTHORIZED);

    let new_login = ctx
        .server
        .post("/auth/login")
        .json(&json!({ "identifier": &email, "password": "NewPassword456!" }))
        .await;
    new_login.assert_status(StatusCode::OK);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn reset_without_otp_confirmation_is_forbidden() {
    let ctx = TestContext::new().await;
    let email = test_email();

    ctx.register_account(&test_meter(), &test_phone(), &email, test_password())
        .await;

    let response = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({
            "identifier": &email,
            "password": "NewPassword456!"
        }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn otp_confirmation_authorizes_exactly_one_reset() {
    let ctx = TestContext::new().await;
    let phone = test_phone();
    let email = test_email();

    ctx.register_account(&test_meter(), &phone, &email, test_password())
        .await;
    ctx.approve_phone("password_reset", &format!("+91{phone}"))
        .await;

    let first = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({ "identifier": &email, "password": "NewPassword456!" }))
        .await;
    first.assert_status(StatusCode::OK);

    // Replaying the flow without a fresh confirmation must fail.
    let second = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({ "identifier": &email, "password": "AnotherPass789!" }))
        .await;
    second.assert_status(StatusCode::FORBIDDEN);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn unknown_identifier_is_not_found() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({
            "identifier": "nobody@example.com",
            "password": "NewPassword456!"
        }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);

    ctx.cleanup().await;
}
