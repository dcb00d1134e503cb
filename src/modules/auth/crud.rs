use sqlx::{MySql, Pool};

use super::model::{AccountCredentials, AccountRecovery};
use crate::config::is_duplicate_entry;
use crate::services::phone::IdentifierForms;

// =============================================================================
// AUTH ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("You are not an EB consumer")]
    NotAnEbConsumer,

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account not active. Please contact support.")]
    AccountInactive,

    #[error("User not found. Please check your identifier.")]
    UserNotFound,

    #[error("Phone verification required")]
    PhoneVerificationRequired,

    #[error("Email verification required")]
    EmailVerificationRequired,

    #[error("Phone number not found in records")]
    PhoneMissing,

    #[error("Invalid phone format in database")]
    StoredPhoneInvalid,

    #[error("Hashing error: {0}")]
    Hashing(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AuthError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::NotAnEbConsumer => StatusCode::FORBIDDEN,
            Self::AlreadyRegistered => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::AccountInactive => StatusCode::FORBIDDEN,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::PhoneVerificationRequired => StatusCode::FORBIDDEN,
            Self::EmailVerificationRequired => StatusCode::FORBIDDEN,
            Self::PhoneMissing => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StoredPhoneInvalid => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller; dependency detail stays in logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) => "Database error".to_string(),
            Self::Hashing(_) | Self::Token(_) => "Internal error".to_string(),
            _ => self.to_string(),
        }
    }
}

// =============================================================================
// AUTH CRUD
// =============================================================================

pub struct AuthCrud {
    pool: Pool<MySql>,
}

impl AuthCrud {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// Resolve a login identifier across the joined account+consumer view.
    /// Email matches the account; phone and meter id match the consumer.
    pub async fn find_credentials(
        &self,
        forms: &IdentifierForms,
    ) -> Result<Option<AccountCredentials>, AuthError> {
        let row = sqlx::query_as::<_, AccountCredentials>(
            r#"
            SELECT u.id, u.password, u.is_active
            FROM users u
            JOIN eb_consumers e ON u.eb_consumer_id = e.id
            WHERE LOWER(u.email) = ?
               OR e.phone = ?
               OR RIGHT(REPLACE(REPLACE(REPLACE(e.phone, '+', ''), '-', ''), ' ', ''), 10) = ?
               OR e.meter_id = ?
            ORDER BY u.id
            LIMIT 1
            "#,
        )
        .bind(&forms.lower)
        .bind(forms.canonical_phone.as_deref().unwrap_or(""))
        .bind(forms.last10.as_deref().unwrap_or(""))
        .bind(&forms.upper)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Same resolution, but for the recovery flow: returns the account id
    /// and the consumer's phone that will receive the OTP.
    pub async fn find_recovery(
        &self,
        forms: &IdentifierForms,
    ) -> Result<Option<AccountRecovery>, AuthError> {
        let row = sqlx::query_as::<_, AccountRecovery>(
            r#"
            SELECT u.id, e.phone
            FROM users u
            JOIN eb_consumers e ON u.eb_consumer_id = e.id
            WHERE LOWER(u.email) = ?
               OR e.phone = ?
               OR RIGHT(REPLACE(REPLACE(REPLACE(e.phone, '+', ''), '-', ''), ' ', ''), 10) = ?
               OR e.meter_id = ?
            ORDER BY u.id
            LIMIT 1
            "#,
        )
        .bind(&forms.lower)
        .bind(forms.canonical_phone.as_deref().unwrap_or(""))
        .bind(forms.last10.as_deref().unwrap_or(""))
        .bind(&forms.upper)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Create the portal account for a consumer, enforcing the 1:1 link.
    /// The existence check runs inside a transaction; the unique keys on
    /// eb_consumer_id and email are the backstop for the race window.
    pub async fn link_account(
        &self,
        consumer_id: u64,
        name: &str,
        email: &str,
        phone: &str,
        password_hash: &str,
    ) -> Result<u64, AuthError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<(u64,)> =
            sqlx::query_as("SELECT id FROM users WHERE eb_consumer_id = ?")
                .bind(consumer_id)
                .fetch_optional(&mut *tx)
                .await?;

        if existing.is_some() {
            tx.rollback().await?;
            return Err(AuthError::AlreadyRegistered);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (name, email, password, phone, eb_consumer_id, is_active)
            VALUES (?, ?, ?, ?, ?, TRUE)
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(phone)
        .bind(consumer_id)
        .execute(&mut *tx)
        .await;

        let user_id = match inserted {
            Ok(result) => result.last_insert_id(),
            Err(e) if is_duplicate_entry(&e) => {
                tx.rollback().await?;
                return Err(AuthError::AlreadyRegistered);
            }
            Err(e) => {
                tx.rollback().await?;
                return Err(e.into());
            }
        };

        tx.commit().await?;
        Ok(user_id)
    }

    pub async fn update_password(&self, user_id: u64, password_hash: &str) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET password = ?, updated_at = NOW() WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
