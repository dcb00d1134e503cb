use axum::http::StatusCode;
use serde_json::json;
use serial_test::serial;

use crate::common::{test_email, test_meter, test_password, test_phone, TestContext};

#[tokio::test]
#[serial]
async fn send_verify_and_poll_complete_the_pre_account_flow() {
    let ctx = TestContext::new().await;
    let email = test_email();

    let send = ctx
        .server
        .post("/auth/send-register-email-verification")
        .json(&json!({ "email": &email }))
        .await;
    send.assert_status(StatusCode::OK);

    // Not verified until the link is visited.
    let pending = ctx
        .server
        .get("/auth/check-register-email")
        .add_query_param("email", &email)
        .await;
    let body: serde_json::Value = pending.json();
    assert_eq!(body["verified"], false);

    let token = ctx.registration_token(&email).await;

    let confirm = ctx
        .server
        .get("/auth/verify-register-email")
        .add_query_param("token", &token)
        .await;
    confirm.assert_status(StatusCode::OK);

    let body: serde_json::Value = confirm.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["email"], email.to_lowercase());

    let verified = ctx
        .server
        .get("/auth/check-register-email")
        .add_query_param("email", &email)
        .await;
    let body: serde_json::Value = verified.json();
    assert_eq!(body["verified"], true);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn a_token_confirms_at_most_once() {
    let ctx = TestContext::new().await;
    let email = test_email();

    ctx.server
        .post("/auth/send-register-email-verification")
        .json(&json!({ "email": &email }))
        .await
        .assert_status(StatusCode::OK);

    let token = ctx.registration_token(&email).await;

    ctx.server
        .get("/auth/verify-register-email")
        .add_query_param("token", &token)
        .await
        .assert_status(StatusCode::OK);

    let replay = ctx
        .server
        .get("/auth/verify-register-email")
        .add_query_param("token", &token)
        .await;

    replay.assert_status(StatusCode::NOT_FOUND);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn expired_token_is_gone_and_deleted() {
    let ctx = TestContext::new().await;
    let email = test_email();

    ctx.server
        .post("/auth/send-register-email-verification")
        .json(&json!({ "email": &email }))
        .await
        .assert_status(StatusCode::OK);

    sqlx::query(
        "UPDATE temp_email_verification SET expires_at = DATE_SUB(NOW(), INTERVAL 1 MINUTE) WHERE email = ?",
    )
    .bind(email.to_lowercase())
    .execute(&ctx.db)
    .await
    .unwrap();

    let token = ctx.registration_token(&email).await;

    let confirm = ctx
        .server
        .get("/auth/verify-register-email")
        .add_query_param("token", &token)
        .await;
    confirm.assert_status(StatusCode::GONE);

    let row: Option<(String,)> =
        sqlx::query_as("SELECT token FROM temp_email_verification WHERE email = ?")
            .bind(email.to_lowercase())
            .fetch_optional(&ctx.db)
            .await
            .unwrap();
    assert!(row.is_none(), "expired row must be deleted on lookup");

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn resend_invalidates_the_earlier_token() {
    let ctx = TestContext::new().await;
    let email = test_email();

    ctx.server
        .post("/auth/send-register-email-verification")
        .json(&json!({ "email": &email }))
        .await
        .assert_status(StatusCode::OK);
    let first_token = ctx.registration_token(&email).await;

    ctx.server
        .post("/auth/send-register-email-verification")
        .json(&json!({ "email": &email }))
        .await
        .assert_status(StatusCode::OK);
    let second_token = ctx.registration_token(&email).await;

    assert_ne!(first_token, second_token);

    ctx.server
        .get("/auth/verify-register-email")
        .add_query_param("token", &first_token)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    ctx.server
        .get("/auth/verify-register-email")
        .add_query_param("token", &second_token)
        .await
        .assert_status(StatusCode::OK);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn already_registered_email_is_rejected_before_any_token_exists() {
    let ctx = TestContext::new().await;
    let email = test_email();

    ctx.register_account(&test_meter(), &test_phone(), &email, test_password())
        .await;

    let response = ctx
        .server
        .post("/auth/send-register-email-verification")
        .json(&json!({ "email": &email }))
        .await;

    response.assert_status(StatusCode::CONFLICT);

    let row: Option<(String,)> =
        sqlx::query_as("SELECT token FROM temp_email_verification WHERE email = ?")
            .bind(email.to_lowercase())
            .fetch_optional(&ctx.db)
            .await
            .unwrap();
    assert!(row.is_none(), "no token may be created for a taken email");

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn registration_consumes_the_verified_row() {
    let ctx = TestContext::new().await;
    let email = test_email();

    ctx.register_account(&test_meter(), &test_phone(), &email, test_password())
        .await;

    let check = ctx
        .server
        .get("/auth/check-register-email")
        .add_query_param("email", &email)
        .await;
    let body: serde_json::Value = check.json();
    assert_eq!(body["verified"], false);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn invalid_email_shape_is_rejected() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/auth/send-register-email-verification")
        .json(&json!({ "email": "not-an-email" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    ctx.cleanup().await;
}
