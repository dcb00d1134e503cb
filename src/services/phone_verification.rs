use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use sqlx::{MySql, Pool};

/// Seconds a client must wait before re-requesting a code for the same flow.
const RESEND_COOLDOWN_SECS: i64 = 60;

/// External phone-identity provider: start a challenge for a phone number,
/// then check a 6-digit code against it. The provider owns all challenge
/// state; we hold only the opaque handle it returns.
#[async_trait]
pub trait PhoneVerifier: Send + Sync {
    async fn start_challenge(&self, phone: &str) -> Result<String, ProviderError>;
    async fn check_code(&self, phone: &str, code: &str) -> Result<bool, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Provider error: {0}")]
    Api(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

// =============================================================================
// TWILIO VERIFY CLIENT
// =============================================================================

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct VerificationCheckResponse {
    status: String,
}

pub struct TwilioVerifyClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    service_sid: String,
    base_url: String,
}

impl TwilioVerifyClient {
    pub fn new(account_sid: String, auth_token: String, service_sid: String) -> Self {
        Self {
            client: Client::new(),
            account_sid,
            auth_token,
            service_sid,
            base_url: "https://verify.twilio.com".to_string(),
        }
    }
}

#[async_trait]
impl PhoneVerifier for TwilioVerifyClient {
    async fn start_challenge(&self, phone: &str) -> Result<String, ProviderError> {
        let url = format!("{}/v2/Services/{}/Verifications", self.base_url, self.service_sid);

        let mut form = HashMap::new();
        form.insert("To", phone);
        form.insert("Channel", "sms");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            tracing::error!("OTP challenge request failed (status={}): {}", status, detail);
            return Err(ProviderError::Api(format!("provider returned status: {}", status)));
        }

        let body: VerificationResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(body.sid)
    }

    async fn check_code(&self, phone: &str, code: &str) -> Result<bool, ProviderError> {
        let url = format!("{}/v2/Services/{}/VerificationCheck", self.base_url, self.service_sid);

        let mut form = HashMap::new();
        form.insert("To", phone);
        form.insert("Code", code);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Api(format!(
                "provider returned status: {}",
                response.status()
            )));
        }

        let body: VerificationCheckResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(body.status == "approved")
    }
}

// =============================================================================
// COORDINATOR
// =============================================================================

/// Which downstream write a confirmed challenge authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationFlow {
    Register,
    PasswordReset,
    PhoneChange,
}

impl VerificationFlow {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationFlow::Register => "register",
            VerificationFlow::PasswordReset => "password_reset",
            VerificationFlow::PhoneChange => "phone_change",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "register" => Some(VerificationFlow::Register),
            "password_reset" => Some(VerificationFlow::PasswordReset),
            "phone_change" => Some(VerificationFlow::PhoneChange),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PhoneVerificationError {
    #[error("Please wait before requesting another code")]
    CooldownActive,

    #[error("No verification in progress for this phone number")]
    ChallengeNotFound,

    #[error("Invalid code. Please request a new OTP")]
    CodeRejected,

    #[error("Phone verification service unavailable")]
    Provider(#[source] ProviderError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl PhoneVerificationError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::CooldownActive => StatusCode::TOO_MANY_REQUESTS,
            Self::ChallengeNotFound => StatusCode::BAD_REQUEST,
            Self::CodeRejected => StatusCode::UNAUTHORIZED,
            Self::Provider(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller; dependency detail stays in logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) => "Database error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Orchestrates OTP issuance and confirmation against the provider and
/// records durable per-(flow, phone) challenge state. A confirmed row
/// authorizes exactly one downstream write via `consume`.
pub struct PhoneVerificationCoordinator<'a> {
    pool: Pool<MySql>,
    verifier: &'a dyn PhoneVerifier,
}

impl<'a> PhoneVerificationCoordinator<'a> {
    pub fn new(pool: Pool<MySql>, verifier: &'a dyn PhoneVerifier) -> Self {
        Self { pool, verifier }
    }

    /// Idle -> OtpRequested. Enforces the 60-second re-request cooldown,
    /// then asks the provider to start a challenge. A provider failure
    /// fully resets local state so the caller can request again.
    pub async fn send_code(
        &self,
        flow: VerificationFlow,
        phone: &str,
    ) -> Result<(), PhoneVerificationError> {
        let requested_at: Option<(DateTime<Utc>,)> = sqlx::query_as(
            "SELECT requested_at FROM phone_verifications WHERE flow = ? AND phone = ?",
        )
        .bind(flow.as_str())
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((requested_at,)) = requested_at {
            if (Utc::now() - requested_at).num_seconds() < RESEND_COOLDOWN_SECS {
                return Err(PhoneVerificationError::CooldownActive);
            }
        }

        let sid = match self.verifier.start_challenge(phone).await {
            Ok(sid) => sid,
            Err(e) => {
                self.reset(flow, phone).await?;
                return Err(PhoneVerificationError::Provider(e));
            }
        };

        sqlx::query(
            r#"
            INSERT INTO phone_verifications (flow, phone, provider_sid, status, requested_at, confirmed_at)
            VALUES (?, ?, ?, 'pending', NOW(), NULL)
            ON DUPLICATE KEY UPDATE
                provider_sid = VALUES(provider_sid),
                status = 'pending',
                requested_at = NOW(),
                confirmed_at = NULL
            "#,
        )
        .bind(flow.as_str())
        .bind(phone)
        .bind(&sid)
        .execute(&self.pool)
        .await?;

        tracing::info!("OTP challenge started for {} ({})", phone, flow.as_str());
        Ok(())
    }

    /// OtpRequested -> OtpConfirmed. A rejected code discards the challenge;
    /// the same handle is never retried, a fresh OTP must be requested.
    pub async fn confirm_code(
        &self,
        flow: VerificationFlow,
        phone: &str,
        code: &str,
    ) -> Result<(), PhoneVerificationError> {
        let pending: Option<(String,)> = sqlx::query_as(
            "SELECT provider_sid FROM phone_verifications WHERE flow = ? AND phone = ? AND status = 'pending'",
        )
        .bind(flow.as_str())
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        if pending.is_none() {
            return Err(PhoneVerificationError::ChallengeNotFound);
        }

        let approved = self
            .verifier
            .check_code(phone, code)
            .await
            .map_err(PhoneVerificationError::Provider)?;

        if !approved {
            self.reset(flow, phone).await?;
            return Err(PhoneVerificationError::CodeRejected);
        }

        sqlx::query(
            "UPDATE phone_verifications SET status = 'approved', confirmed_at = NOW() WHERE flow = ? AND phone = ?",
        )
        .bind(flow.as_str())
        .bind(phone)
        .execute(&self.pool)
        .await?;

        tracing::info!("OTP confirmed for {} ({})", phone, flow.as_str());
        Ok(())
    }

    /// Atomically consume a confirmed challenge. Returns true exactly once
    /// per confirmation; replays find no row to delete.
    pub async fn consume(
        &self,
        flow: VerificationFlow,
        phone: &str,
    ) -> Result<bool, PhoneVerificationError> {
        let result = sqlx::query(
            "DELETE FROM phone_verifications WHERE flow = ? AND phone = ? AND status = 'approved'",
        )
        .bind(flow.as_str())
        .bind(phone)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn reset(&self, flow: VerificationFlow, phone: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM phone_verifications WHERE flow = ? AND phone = ?")
            .bind(flow.as_str())
            .bind(phone)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
