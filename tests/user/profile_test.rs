use axum::http::StatusCode;
use serde_json::json;
use serial_test::serial;

use crate::common::{test_email, test_meter, test_password, test_phone, TestContext};

fn complete_general_info() -> serde_json::Value {
    json!({
        "name": "Asha Kumar",
        "date_of_birth": "1992-06-15",
        "gender": "Female",
        "address_line1": "14 Gandhi Street",
        "city": "Chennai",
        "district": "Chennai",
        "state": "Tamil Nadu",
        "pincode": "600001"
    })
}

#[tokio::test]
#[serial]
async fn profile_requires_a_session_token() {
    let ctx = TestContext::new().await;

    let response = ctx.server.get("/user/profile").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let bad = ctx
        .server
        .get("/user/profile")
        .authorization_bearer("not-a-real-token")
        .await;
    bad.assert_status(StatusCode::UNAUTHORIZED);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn profile_returns_the_joined_account_and_consumer_view() {
    let ctx = TestContext::new().await;
    let meter = test_meter();
    let phone = test_phone();
    let email = test_email();

    let token = ctx
        .register_account(&meter, &phone, &email, test_password())
        .await;

    let response = ctx
        .server
        .get("/user/profile")
        .authorization_bearer(&token)
        .await;

    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    assert_eq!(body["email"], email.to_lowercase());
    assert_eq!(body["meter_id"], meter);
    assert_eq!(body["consumer_type"], "DOMESTIC");
    assert_eq!(body["country"], "India");
    assert_eq!(body["profile_completed"], false);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn completing_every_required_field_sets_the_flag() {
    let ctx = TestContext::new().await;
    let token = ctx
        .register_account(&test_meter(), &test_phone(), &test_email(), test_password())
        .await;

    let response = ctx
        .server
        .put("/user/profile/general")
        .authorization_bearer(&token)
        .json(&complete_general_info())
        .await;

    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    assert_eq!(body["profile_completed"], true);

    let profile = ctx
        .server
        .get("/user/profile")
        .authorization_bearer(&token)
        .await;
    let body: serde_json::Value = profile.json();
    assert_eq!(body["profile_completed"], true);
    assert_eq!(body["city"], "Chennai");
    assert_eq!(body["date_of_birth"], "1992-06-15");

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn any_missing_required_field_leaves_the_flag_unset() {
    let ctx = TestContext::new().await;
    let token = ctx
        .register_account(&test_meter(), &test_phone(), &test_email(), test_password())
        .await;

    let mut info = complete_general_info();
    info.as_object_mut().unwrap().remove("district");

    let response = ctx
        .server
        .put("/user/profile/general")
        .authorization_bearer(&token)
        .json(&info)
        .await;

    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    assert_eq!(body["profile_completed"], false);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn client_supplied_completion_flag_is_ignored() {
    let ctx = TestContext::new().await;
    let token = ctx
        .register_account(&test_meter(), &test_phone(), &test_email(), test_password())
        .await;

    let mut info = complete_general_info();
    let obj = info.as_object_mut().unwrap();
    obj.remove("pincode");
    obj.insert("profile_completed".to_string(), json!(true));

    let response = ctx
        .server
        .put("/user/profile/general")
        .authorization_bearer(&token)
        .json(&info)
        .await;

    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    assert_eq!(body["profile_completed"], false);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn update_is_full_replace_not_a_patch() {
    let ctx = TestContext::new().await;
    let token = ctx
        .register_account(&test_meter(), &test_phone(), &test_email(), test_password())
        .await;

    ctx.server
        .put("/user/profile/general")
        .authorization_bearer(&token)
        .json(&complete_general_info())
        .await
        .assert_status(StatusCode::OK);

    // A later update that omits the address clears it.
    let response = ctx
        .server
        .put("/user/profile/general")
        .authorization_bearer(&token)
        .json(&json!({ "name": "Asha Kumar" }))
        .await;
    response.assert_status(StatusCode::OK);

    let profile = ctx
        .server
        .get("/user/profile")
        .authorization_bearer(&token)
        .await;
    let body: serde_json::Value = profile.json();
    assert!(body["address_line1"].is_null());
    assert_eq!(body["profile_completed"], false);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn malformed_date_of_birth_is_rejected() {
    let ctx = TestContext::new().await;
    let token = ctx
        .register_account(&test_meter(), &test_phone(), &test_email(), test_password())
        .await;

    let mut info = complete_general_info();
    info.as_object_mut()
        .unwrap()
        .insert("date_of_birth".to_string(), json!("15/06/1992"));

    let response = ctx
        .server
        .put("/user/profile/general")
        .authorization_bearer(&token)
        .json(&info)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    ctx.cleanup().await;
}
