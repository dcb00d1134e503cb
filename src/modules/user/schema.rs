use serde::{Deserialize, Serialize};
use validator::Validate;

pub use crate::modules::auth::schema::{
    ErrorResponse, MessageResponse, SendEmailResponse, SendOtpResponse, VerifyEmailTokenQuery,
};

// =============================================================================
// GENERAL INFO (full-replace: absent fields are cleared)
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateGeneralRequest {
    pub name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub alternate_phone: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateGeneralResponse {
    pub message: &'static str,
    pub profile_completed: bool,
}

// =============================================================================
// PHONE CHANGE
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SendPhoneOtpRequest {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePhoneRequest {
    pub phone: String,
}

// =============================================================================
// EMAIL CHANGE
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct SendEmailVerificationRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    pub message: &'static str,
    pub success: bool,
}
