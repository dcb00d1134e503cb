use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::modules::auth::{
    crud::{AuthCrud, AuthError},
    schema::{
        CheckEmailQuery, CheckEmailResponse, ErrorResponse, ForgotPasswordResponse,
        IdentifierRequest, LoginRequest, MessageResponse, PhoneResponse, RegisterRequest,
        ResetPasswordRequest, SendEmailResponse, SendOtpRequest, SendOtpResponse,
        SendRegisterEmailRequest, SessionResponse, VerifyEmailTokenQuery, VerifyOtpRequest,
        VerifyOtpResponse, VerifyRegisterEmailResponse,
    },
};
use crate::modules::consumer::crud::ConsumerCrud;
use crate::services::email_verification::{EmailVerificationCoordinator, EmailVerificationError};
use crate::services::hashing;
use crate::services::phone::{is_phone_shaped, normalize_phone, IdentifierForms};
use crate::services::phone_verification::{
    PhoneVerificationCoordinator, PhoneVerificationError, VerificationFlow,
};
use crate::AppState;

type ErrorReply = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ErrorReply {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

fn auth_error(e: AuthError) -> ErrorReply {
    if e.status_code().is_server_error() {
        tracing::error!("Auth error: {}", e);
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
// REGISTER (after EB check + OTP + email verification)
// =============================================================================

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ErrorReply> {
    if let Err(e) = req.validate() {
        return Err(bad_request(e.to_string()));
    }

    let forms = IdentifierForms::parse(&req.identifier);

    let consumer = ConsumerCrud::new(state.db.clone())
        .resolve(&forms)
        .await
        .map_err(|e| auth_error(e.into()))?
        .ok_or_else(|| auth_error(AuthError::NotAnEbConsumer))?;

    let canonical_phone =
        normalize_phone(&consumer.phone).ok_or_else(|| auth_error(AuthError::StoredPhoneInvalid))?;

    // Preconditions are durable markers written by the verification
    // coordinators; each authorizes this one write and is consumed here.
    let phone_coordinator =
        PhoneVerificationCoordinator::new(state.db.clone(), state.phone_verifier.as_ref());
    if !phone_coordinator
        .consume(VerificationFlow::Register, &canonical_phone)
        .await
        .map_err(otp_error)?
    {
        return Err(auth_error(AuthError::PhoneVerificationRequired));
    }

    let email_coordinator = EmailVerificationCoordinator::new(
        state.db.clone(),
        state.mailer.as_ref(),
        state.frontend_url.clone(),
    );
    if !email_coordinator
        .consume_registration(&req.email)
        .await
        .map_err(email_error)?
    {
        return Err(auth_error(AuthError::EmailVerificationRequired));
    }

    let password_hash = hashing::hash_password(&req.password)
        .map_err(|e| auth_error(AuthError::Hashing(e.to_string())))?;

    let user_id = AuthCrud::new(state.db.clone())
        .link_account(
            consumer.id,
            &req.name,
            &req.email.to_lowercase(),
            &consumer.phone,
            &password_hash,
        )
        .await
        .map_err(auth_error)?;

    let token = state
        .jwt_service
        .create_session_token(user_id)
        .map_err(|e| auth_error(AuthError::Token(e.to_string())))?;

    tracing::info!("Account {} registered for consumer {}", user_id, consumer.meter_id);

    Ok((
        StatusCode::OK,
        Json(SessionResponse {
            message: "Registration successful",
            token,
        }),
    ))
}

// =============================================================================
// LOGIN (email / phone / meter id + password)
// =============================================================================

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ErrorReply> {
    if req.identifier.is_empty() || req.password.is_empty() {
        return Err(bad_request("All fields are required"));
    }

    let forms = IdentifierForms::parse(&req.identifier);

    // Unknown identifier and wrong password collapse into one answer so the
    // response does not reveal which accounts exist.
    let account = AuthCrud::new(state.db.clone())
        .find_credentials(&forms)
        .await
        .map_err(auth_error)?
        .ok_or_else(|| auth_error(AuthError::InvalidCredentials))?;

    if !account.is_active {
        return Err(auth_error(AuthError::AccountInactive));
    }

    let valid = hashing::verify_password(&req.password, &account.password)
        .map_err(|e| auth_error(AuthError::Hashing(e.to_string())))?;

    if !valid {
        return Err(auth_error(AuthError::InvalidCredentials));
    }

    let token = state
        .jwt_service
        .create_session_token(account.id)
        .map_err(|e| auth_error(AuthError::Token(e.to_string())))?;

    Ok((
        StatusCode::OK,
        Json(SessionResponse {
            message: "Login successful",
            token,
        }),
    ))
}

// =============================================================================
// GET PHONE FOR OTP (register & forgot password)
// =============================================================================

pub async fn get_phone(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IdentifierRequest>,
) -> Result<(StatusCode, Json<PhoneResponse>), ErrorReply> {
    if let Err(e) = req.validate() {
        return Err(bad_request(e.to_string()));
    }

    let forms = IdentifierForms::parse(&req.identifier);

    // A phone-shaped identifier that fails canonicalization is a caller
    // mistake, not a missing record.
    if is_phone_shaped(&req.identifier) && forms.canonical_phone.is_none() {
        return Err(bad_request("Invalid phone number format"));
    }

    let phone = ConsumerCrud::new(state.db.clone())
        .resolve_phone(&forms)
        .await
        .map_err(|e| auth_error(e.into()))?
        .ok_or_else(|| auth_error(AuthError::UserNotFound))?;

    if phone.is_empty() {
        return Err(auth_error(AuthError::PhoneMissing));
    }

    let formatted =
        normalize_phone(&phone).ok_or_else(|| auth_error(AuthError::StoredPhoneInvalid))?;

    Ok((StatusCode::OK, Json(PhoneResponse { phone: formatted })))
}

// =============================================================================
// FORGOT PASSWORD (resolve, then OTP to the consumer's phone)
// =============================================================================

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IdentifierRequest>,
) -> Result<(StatusCode, Json<ForgotPasswordResponse>), ErrorReply> {
    if let Err(e) = req.validate() {
        return Err(bad_request(e.to_string()));
    }

    let forms = IdentifierForms::parse(&req.identifier);

    if is_phone_shaped(&req.identifier) && forms.canonical_phone.is_none() {
        return Err(bad_request("Invalid phone number format"));
    }

    let recovery = AuthCrud::new(state.db.clone())
        .find_recovery(&forms)
        .await
        .map_err(auth_error)?
        .ok_or_else(|| auth_error(AuthError::UserNotFound))?;

    if recovery.phone.is_empty() {
        return Err(auth_error(AuthError::PhoneMissing));
    }

    let formatted =
        normalize_phone(&recovery.phone).ok_or_else(|| auth_error(AuthError::StoredPhoneInvalid))?;

    Ok((
        StatusCode::OK,
        Json(ForgotPasswordResponse {
            message: "User found",
            phone: formatted,
        }),
    ))
}

// =============================================================================
// RESET PASSWORD (after OTP confirmation)
// =============================================================================

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ErrorReply> {
    if let Err(e) = req.validate() {
        return Err(bad_request(e.to_string()));
    }

    let forms = IdentifierForms::parse(&req.identifier);

    let crud = AuthCrud::new(state.db.clone());
    let recovery = crud
        .find_recovery(&forms)
        .await
        .map_err(auth_error)?
        .ok_or_else(|| auth_error(AuthError::UserNotFound))?;

    let canonical_phone =
        normalize_phone(&recovery.phone).ok_or_else(|| auth_error(AuthError::StoredPhoneInvalid))?;

    let coordinator =
        PhoneVerificationCoordinator::new(state.db.clone(), state.phone_verifier.as_ref());
    if !coordinator
        .consume(VerificationFlow::PasswordReset, &canonical_phone)
        .await
        .map_err(otp_error)?
    {
        return Err(auth_error(AuthError::PhoneVerificationRequired));
    }

    let password_hash = hashing::hash_password(&req.password)
        .map_err(|e| auth_error(AuthError::Hashing(e.to_string())))?;

    crud.update_password(recovery.id, &password_hash)
        .await
        .map_err(auth_error)?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Password reset successful",
        }),
    ))
}

// =============================================================================
// PHONE OTP (registration and password-recovery flows)
// =============================================================================

pub async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendOtpRequest>,
) -> Result<(StatusCode, Json<SendOtpResponse>), ErrorReply> {
    let flow = match VerificationFlow::parse(&req.flow) {
        Some(flow @ (VerificationFlow::Register | VerificationFlow::PasswordReset)) => flow,
        // Phone changes go through the authenticated profile route.
        _ => return Err(bad_request("Invalid verification flow")),
    };

    let phone = normalize_phone(&req.phone).ok_or_else(|| {
        bad_request("Please provide a valid Indian phone number starting with +91")
    })?;

    PhoneVerificationCoordinator::new(state.db.clone(), state.phone_verifier.as_ref())
        .send_code(flow, &phone)
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

pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<(StatusCode, Json<VerifyOtpResponse>), ErrorReply> {
    let flow = VerificationFlow::parse(&req.flow)
        .ok_or_else(|| bad_request("Invalid verification flow"))?;

    let phone = normalize_phone(&req.phone).ok_or_else(|| {
        bad_request("Please provide a valid Indian phone number starting with +91")
    })?;

    if req.code.len() != 6 || !req.code.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad_request("Please enter a 6-digit OTP"));
    }

    PhoneVerificationCoordinator::new(state.db.clone(), state.phone_verifier.as_ref())
        .confirm_code(flow, &phone, &req.code)
        .await
        .map_err(otp_error)?;

    Ok((
        StatusCode::OK,
        Json(VerifyOtpResponse {
            message: "OTP verified successfully",
            verified: true,
        }),
    ))
}

// =============================================================================
// REGISTRATION EMAIL VERIFICATION (no auth)
// =============================================================================

pub async fn send_register_email_verification(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendRegisterEmailRequest>,
) -> Result<(StatusCode, Json<SendEmailResponse>), ErrorReply> {
    if let Err(e) = req.validate() {
        return Err(bad_request(e.to_string()));
    }

    EmailVerificationCoordinator::new(
        state.db.clone(),
        state.mailer.as_ref(),
        state.frontend_url.clone(),
    )
    .request_registration(&req.email)
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

pub async fn verify_register_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyEmailTokenQuery>,
) -> Result<(StatusCode, Json<VerifyRegisterEmailResponse>), ErrorReply> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| bad_request("Verification token is required"))?;

    let email = EmailVerificationCoordinator::new(
        state.db.clone(),
        state.mailer.as_ref(),
        state.frontend_url.clone(),
    )
    .confirm_registration(&token)
    .await
    .map_err(email_error)?;

    Ok((
        StatusCode::OK,
        Json(VerifyRegisterEmailResponse {
            message: "Email verified successfully!",
            email,
            success: true,
        }),
    ))
}

pub async fn check_register_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CheckEmailQuery>,
) -> Json<CheckEmailResponse> {
    let Some(email) = query.email.filter(|e| !e.is_empty()) else {
        return Json(CheckEmailResponse { verified: false });
    };

    let verified = EmailVerificationCoordinator::new(
        state.db.clone(),
        state.mailer.as_ref(),
        state.frontend_url.clone(),
    )
    .is_verified(&email)
    .await
    .unwrap_or_else(|e| {
        tracing::error!("Verified-email poll failed: {}", e);
        false
    });

    Json(CheckEmailResponse { verified })
}
