use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use std::sync::Arc;
use validator::Validate;

use crate::modules::user::{
    crud::{UserCrud, UserError},
    model::UserProfile,
    schema::{
        ErrorResponse, MessageResponse, SendEmailResponse, SendEmailVerificationRequest,
        SendOtpResponse, SendPhoneOtpRequest, UpdateGeneralRequest, UpdateGeneralResponse,
        UpdatePhoneRequest, VerifyEmailResponse, VerifyEmailTokenQuery,
    },
};
use crate::services::email_verification::{EmailVerificationCoordinator, EmailVerificationError};
use crate::services::jwt::AuthUser;
use crate::services::phone::normalize_phone;
use crate::services::phone_verification::{
    PhoneVerificationCoordinator, PhoneVerificationError, VerificationFlow,
};
use crate::AppState;

type ErrorReply = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ErrorReply {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

fn user_error(e: UserError) -> ErrorReply {
    if e.status_code().is_server_error() {
        tracing::error!("Profile error: {}", e);
    }
    (e.status_code(), Json(ErrorResponse::new(e.public_message())))
}

fn otp_error(e: PhoneVerificationError) -> ErrorReply {
    if e.status_code().is_server_error() {
        tracing::error!("Phone verification error: {}", e);
    }
    (e.status_code(), Json(ErrorResponse::new(e.public_message())))
}

fn email_error(e: EmailVerificationError) -> ErrorReply {
    if e.status_code().is_server_error() {
        tracing::error!("Email verification error: {}", e);
    }
    (e.status_code(), Json(ErrorResponse::new(e.public_message())))
}

// =============================================================================
// PROFILE
// =============================================================================

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<UserProfile>, ErrorReply> {
    let profile = UserCrud::new(state.db.clone())
        .get_profile(auth.user_id)
        .await
        .map_err(user_error)?
        .ok_or_else(|| user_error(UserError::UserNotFound))?;

    Ok(Json(profile))
}

pub async fn update_general_info(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<UpdateGeneralRequest>,
) -> Result<(StatusCode, Json<UpdateGeneralResponse>), ErrorReply> {
    // Tolerate full ISO timestamps from the client; only the date is kept.
    let date_of_birth = match req.date_of_birth.as_deref().filter(|v| !v.is_empty()) {
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d")
                .map_err(|_| bad_request("Invalid date of birth"))?,
        ),
        None => None,
    };

    let profile_completed = UserCrud::new(state.db.clone())
        .update_general(auth.user_id, &req, date_of_birth)
        .await
        .map_err(user_error)?;

    Ok((
        StatusCode::OK,
        Json(UpdateGeneralResponse {
            message: "Profile updated successfully",
            profile_completed,
        }),
    ))
}

// =============================================================================
// PHONE CHANGE (OTP-gated, writes both tables)
// =============================================================================

pub async fn send_phone_otp(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<SendPhoneOtpRequest>,
) -> Result<(StatusCode, Json<SendOtpResponse>), ErrorReply> {
    let phone = normalize_phone(&req.phone).ok_or_else(|| {
        bad_request("Please provide a valid Indian phone number starting with +91")
    })?;

    let current = UserCrud::new(state.db.clone())
        .current_phone(auth.user_id)
        .await
        .map_err(user_error)?
        .ok_or_else(|| user_error(UserError::UserNotFound))?;

    // Rejected before any provider call.
    if normalize_phone(&current).as_deref() == Some(phone.as_str()) {
        return Err(bad_request("This is already your current phone number"));
    }

    PhoneVerificationCoordinator::new(state.db.clone(), state.phone_verifier.as_ref())
        .send_code(VerificationFlow::PhoneChange, &phone)
        .await
        .map_err(otp_error)?;

    Ok((
        StatusCode::OK,
        Json(SendOtpResponse {
            message: "OTP sent",
            phone,
        }),
    ))
}

pub async fn update_phone(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<UpdatePhoneRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ErrorReply> {
    let phone =
        normalize_phone(&req.phone).ok_or_else(|| bad_request("Invalid phone number"))?;

    let crud = UserCrud::new(state.db.clone());

    if crud
        .phone_in_use_by_other(&phone, auth.user_id)
        .await
        .map_err(user_error)?
    {
        return Err(user_error(UserError::PhoneInUse));
    }

    let consumed = PhoneVerificationCoordinator::new(state.db.clone(), state.phone_verifier.as_ref())
        .consume(VerificationFlow::PhoneChange, &phone)
        .await
        .map_err(otp_error)?;

    if !consumed {
        return Err(user_error(UserError::PhoneVerificationRequired));
    }

    crud.update_phone_everywhere(auth.user_id, &phone)
        .await
        .map_err(user_error)?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Phone number updated successfully",
        }),
    ))
}

// =============================================================================
// EMAIL CHANGE (token-gated)
// =============================================================================

pub async fn send_email_verification(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<SendEmailVerificationRequest>,
) -> Result<(StatusCode, Json<SendEmailResponse>), ErrorReply> {
    if let Err(e) = req.validate() {
        return Err(bad_request(e.to_string()));
    }

    EmailVerificationCoordinator::new(
        state.db.clone(),
        state.mailer.as_ref(),
        state.frontend_url.clone(),
    )
    .request_change(auth.user_id, &req.email)
    .await
    .map_err(email_error)?;

    Ok((
        StatusCode::OK,
        Json(SendEmailResponse {
            message: "Verification email sent successfully. Please check your inbox.",
            email: req.email.to_lowercase(),
        }),
    ))
}

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Query(query): Query<VerifyEmailTokenQuery>,
) -> Result<(StatusCode, Json<VerifyEmailResponse>), ErrorReply> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| bad_request("Verification token is required"))?;

    EmailVerificationCoordinator::new(
        state.db.clone(),
        state.mailer.as_ref(),
        state.frontend_url.clone(),
    )
    .confirm_change(&token)
    .await
    .map_err(email_error)?;

    Ok((
        StatusCode::OK,
        Json(VerifyEmailResponse {
            message: "Email verified and updated successfully!",
            success: true,
        }),
    ))
}
