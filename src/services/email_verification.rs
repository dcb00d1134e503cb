use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::{MySql, Pool};

use crate::config::is_duplicate_entry;
use crate::services::mailer::{verification_email_html, MailError, Mailer};

const TOKEN_TTL_MINUTES: i64 = 15;

/// Opaque single-use token: 32 random bytes, hex encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

fn token_expiry() -> DateTime<Utc> {
    Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES)
}

#[derive(Debug, thiserror::Error)]
pub enum EmailVerificationError {
    #[error("This email is already registered")]
    EmailAlreadyRegistered,

    #[error("This verification link has already been used or is invalid")]
    InvalidToken,

    #[error("Verification link has expired. Please request a new one.")]
    Expired,

    #[error("Failed to send verification email")]
    Mail(#[from] MailError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl EmailVerificationError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::EmailAlreadyRegistered => StatusCode::CONFLICT,
            Self::InvalidToken => StatusCode::NOT_FOUND,
            Self::Expired => StatusCode::GONE,
            Self::Mail(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller; dependency detail stays in logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) => "Database error".to_string(),
            Self::Mail(_) => "Failed to send verification email. Please try again.".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Issues single-use, time-limited email tokens and performs the
/// confirming state transition exactly once.
///
/// Two flows share the mechanism: the registration flow is keyed by raw
/// email (no account exists yet) and records a durable `verified` flag
/// that registration later consumes; the profile-change flow is keyed by
/// account id and commits the new email directly on confirmation.
pub struct EmailVerificationCoordinator<'a> {
    pool: Pool<MySql>,
    mailer: &'a dyn Mailer,
    frontend_url: String,
}

impl<'a> EmailVerificationCoordinator<'a> {
    pub fn new(pool: Pool<MySql>, mailer: &'a dyn Mailer, frontend_url: String) -> Self {
        Self {
            pool,
            mailer,
            frontend_url,
        }
    }

    // =========================================================================
    // REGISTRATION FLOW (pre-account, keyed by email)
    // =========================================================================

    /// Issue a token for a not-yet-registered email and mail the link.
    /// A repeat request overwrites the earlier row, invalidating its token.
    pub async fn request_registration(&self, email: &str) -> Result<(), EmailVerificationError> {
        let email = email.to_lowercase();

        let taken: Option<(u64,)> = sqlx::query_as("SELECT id FROM users WHERE LOWER(email) = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;

        if taken.is_some() {
            return Err(EmailVerificationError::EmailAlreadyRegistered);
        }

        let token = generate_token();

        sqlx::query(
            r#"
            INSERT INTO temp_email_verification (email, token, verified, expires_at)
            VALUES (?, ?, FALSE, ?)
            ON DUPLICATE KEY UPDATE
                token = VALUES(token),
                verified = FALSE,
                expires_at = VALUES(expires_at)
            "#,
        )
        .bind(&email)
        .bind(&token)
        .bind(token_expiry())
        .execute(&self.pool)
        .await?;

        let url = format!("{}/verify-register-email?token={}", self.frontend_url, token);
        let html = verification_email_html(
            "Verify Your Email Address",
            "Welcome! You're almost ready to start using Smart Energy System. \
             Please click the button below to verify your email address:",
            &url,
        );

        self.mailer
            .send(&email, "Verify Your Email - Smart Energy System Registration", &html)
            .await?;

        tracing::info!("Registration verification email sent to {}", email);
        Ok(())
    }

    /// Confirm a registration token. Marks the row verified so a polling
    /// check and the registration step can both observe success. A token
    /// confirms at most once; expiry deletes the row.
    pub async fn confirm_registration(&self, token: &str) -> Result<String, EmailVerificationError> {
        let row: Option<(String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT email, expires_at FROM temp_email_verification WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some((email, expires_at)) = row else {
            return Err(EmailVerificationError::InvalidToken);
        };

        if Utc::now() > expires_at {
            sqlx::query("DELETE FROM temp_email_verification WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await?;
            return Err(EmailVerificationError::Expired);
        }

        let result = sqlx::query(
            "UPDATE temp_email_verification SET verified = TRUE WHERE token = ? AND verified = FALSE",
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EmailVerificationError::InvalidToken);
        }

        tracing::info!("Registration email verified: {}", email);
        Ok(email)
    }

    /// Polling check used by the registration page.
    pub async fn is_verified(&self, email: &str) -> Result<bool, EmailVerificationError> {
        let row: Option<(bool,)> = sqlx::query_as(
            "SELECT verified FROM temp_email_verification WHERE email = ?",
        )
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some_and(|(verified,)| verified))
    }

    /// Atomically consume the verified row during registration. Returns
    /// true exactly once per verified email.
    pub async fn consume_registration(&self, email: &str) -> Result<bool, EmailVerificationError> {
        let result = sqlx::query(
            "DELETE FROM temp_email_verification WHERE email = ? AND verified = TRUE",
        )
        .bind(email.to_lowercase())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // PROFILE-CHANGE FLOW (post-account, keyed by account id)
    // =========================================================================

    /// Issue a token for an email change and mail the link to the target
    /// address. Fails before any token exists if another account owns it.
    pub async fn request_change(
        &self,
        user_id: u64,
        new_email: &str,
    ) -> Result<(), EmailVerificationError> {
        let new_email = new_email.to_lowercase();

        let taken: Option<(u64,)> =
            sqlx::query_as("SELECT id FROM users WHERE LOWER(email) = ? AND id != ?")
                .bind(&new_email)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        if taken.is_some() {
            return Err(EmailVerificationError::EmailAlreadyRegistered);
        }

        let token = generate_token();

        sqlx::query(
            r#"
            INSERT INTO email_change_tokens (user_id, email, token, expires_at)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                email = VALUES(email),
                token = VALUES(token),
                expires_at = VALUES(expires_at)
            "#,
        )
        .bind(user_id)
        .bind(&new_email)
        .bind(&token)
        .bind(token_expiry())
        .execute(&self.pool)
        .await?;

        let url = format!("{}/verify-email?token={}", self.frontend_url, token);
        let html = verification_email_html(
            "Verify Your Email Address",
            "You requested to update your email address. \
             Please click the button below to verify your new email:",
            &url,
        );

        self.mailer
            .send(&new_email, "Verify Your Email - Smart Energy System", &html)
            .await?;

        tracing::info!("Email-change verification sent for user {}", user_id);
        Ok(())
    }

    /// Confirm an email-change token: commits the new email onto the
    /// account and deletes the token in one transaction. The update is the
    /// observable state; a consumed token never confirms a second time.
    pub async fn confirm_change(&self, token: &str) -> Result<u64, EmailVerificationError> {
        let row: Option<(u64, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT user_id, email, expires_at FROM email_change_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some((user_id, email, expires_at)) = row else {
            return Err(EmailVerificationError::InvalidToken);
        };

        if Utc::now() > expires_at {
            sqlx::query("DELETE FROM email_change_tokens WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await?;
            return Err(EmailVerificationError::Expired);
        }

        let mut tx = self.pool.begin().await?;

        let consumed = sqlx::query("DELETE FROM email_change_tokens WHERE token = ?")
            .bind(token)
            .execute(&mut *tx)
            .await?;

        if consumed.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(EmailVerificationError::InvalidToken);
        }

        let updated = sqlx::query("UPDATE users SET email = ?, updated_at = NOW() WHERE id = ?")
            .bind(&email)
            .bind(user_id)
            .execute(&mut *tx)
            .await;

        match updated {
            Ok(_) => {}
            Err(e) if is_duplicate_entry(&e) => {
                tx.rollback().await?;
                return Err(EmailVerificationError::EmailAlreadyRegistered);
            }
            Err(e) => {
                tx.rollback().await?;
                return Err(e.into());
            }
        }

        tx.commit().await?;

        tracing::info!("Email updated for user {} via verification link", user_id);
        Ok(user_id)
    }

    // =========================================================================
    // MAINTENANCE
    // =========================================================================

    /// Drop expired rows from both token tables. Run on the background
    /// interval; expiry is otherwise only detected on lookup.
    pub async fn sweep_expired(pool: &Pool<MySql>) -> Result<u64, sqlx::Error> {
        let a = sqlx::query("DELETE FROM temp_email_verification WHERE expires_at < NOW()")
            .execute(pool)
            .await?;
        let b = sqlx::query("DELETE FROM email_change_tokens WHERE expires_at < NOW()")
            .execute(pool)
            .await?;
        Ok(a.rows_affected() + b.rows_affected())
    }
}
