use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::controller;
use crate::AppState;

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(controller::register))
        .route("/login", post(controller::login))
        .route("/get-phone", post(controller::get_phone))
        .route("/forgot-password", post(controller::forgot_password))
        .route("/reset-password", post(controller::reset_password))
        .route("/send-otp", post(controller::send_otp))
        .route("/verify-otp", post(controller::verify_otp))
        .route(
            "/send-register-email-verification",
            post(controller::send_register_email_verification),
        )
        .route("/verify-register-email", get(controller::verify_register_email))
        .route("/check-register-email", get(controller::check_register_email))
}
