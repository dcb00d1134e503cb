use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use super::controller;
use crate::AppState;

pub fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", get(controller::get_profile))
        .route("/profile/general", put(controller::update_general_info))
        .route("/profile/phone", put(controller::update_phone))
        .route("/profile/phone/send-otp", post(controller::send_phone_otp))
        .route(
            "/profile/email/send-verification",
            post(controller::send_email_verification),
        )
        .route("/verify-email", get(controller::verify_email))
}
