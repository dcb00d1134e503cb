use chrono::NaiveDate;
use sqlx::{MySql, Pool};

use super::model::UserProfile;
use super::schema::UpdateGeneralRequest;

// =============================================================================
// USER ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    UserNotFound,

    #[error("This phone number is already registered")]
    PhoneInUse,

    #[error("Phone verification required")]
    PhoneVerificationRequired,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl UserError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::PhoneInUse => StatusCode::CONFLICT,
            Self::PhoneVerificationRequired => StatusCode::FORBIDDEN,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) => "Update failed".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Derived completion flag: true iff every required personal and address
/// field is populated. Never trusted from client input.
pub fn is_profile_complete(req: &UpdateGeneralRequest, date_of_birth: Option<NaiveDate>) -> bool {
    fn filled(value: &Option<String>) -> bool {
        value.as_deref().is_some_and(|v| !v.trim().is_empty())
    }

    filled(&req.name)
        && date_of_birth.is_some()
        && filled(&req.gender)
        && filled(&req.address_line1)
        && filled(&req.city)
        && filled(&req.district)
        && filled(&req.state)
        && filled(&req.pincode)
}

// =============================================================================
// USER CRUD
// =============================================================================

pub struct UserCrud {
    pool: Pool<MySql>,
}

impl UserCrud {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    pub async fn get_profile(&self, user_id: u64) -> Result<Option<UserProfile>, UserError> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT
                u.id, u.name, u.email, u.phone, u.date_of_birth, u.gender,
                u.alternate_phone, u.address_line1, u.address_line2, u.city,
                u.district, u.state, u.pincode, u.country, u.profile_completed,
                e.meter_id, e.consumer_type
            FROM users u
            JOIN eb_consumers e ON u.eb_consumer_id = e.id
            WHERE u.id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Full-replace write of the personal and address fields. Absent fields
    /// are cleared; the completion flag is recomputed here, never taken
    /// from the request.
    pub async fn update_general(
        &self,
        user_id: u64,
        req: &UpdateGeneralRequest,
        date_of_birth: Option<NaiveDate>,
    ) -> Result<bool, UserError> {
        let completed = is_profile_complete(req, date_of_birth);

        sqlx::query(
            r#"
            UPDATE users
            SET
                name = ?,
                date_of_birth = ?,
                gender = ?,
                alternate_phone = ?,
                address_line1 = ?,
                address_line2 = ?,
                city = ?,
                district = ?,
                state = ?,
                pincode = ?,
                country = ?,
                profile_completed = ?,
                updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(req.name.as_deref().unwrap_or(""))
        .bind(date_of_birth)
        .bind(&req.gender)
        .bind(&req.alternate_phone)
        .bind(&req.address_line1)
        .bind(&req.address_line2)
        .bind(&req.city)
        .bind(&req.district)
        .bind(&req.state)
        .bind(&req.pincode)
        .bind(req.country.as_deref().unwrap_or("India"))
        .bind(completed)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(completed)
    }

    pub async fn current_phone(&self, user_id: u64) -> Result<Option<String>, UserError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT phone FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(phone,)| phone))
    }

    /// Stored phones predate canonicalization, so the uniqueness check
    /// matches on the last-10-digit form as well as exact equality.
    pub async fn phone_in_use_by_other(&self, phone: &str, user_id: u64) -> Result<bool, UserError> {
        let last10 = crate::services::phone::last_ten_digits(phone).unwrap_or_default();

        let row: Option<(u64,)> = sqlx::query_as(
            r#"
            SELECT id FROM users
            WHERE (phone = ?
                   OR RIGHT(REPLACE(REPLACE(REPLACE(phone, '+', ''), '-', ''), ' ', ''), 10) = ?)
              AND id != ?
            LIMIT 1
            "#,
        )
        .bind(phone)
        .bind(&last10)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Write the new phone onto the account and its linked consumer as one
    /// unit. Both rows change or neither does.
    pub async fn update_phone_everywhere(&self, user_id: u64, phone: &str) -> Result<(), UserError> {
        let mut tx = self.pool.begin().await?;

        let consumer: Option<(u64,)> =
            sqlx::query_as("SELECT eb_consumer_id FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((eb_consumer_id,)) = consumer else {
            tx.rollback().await?;
            return Err(UserError::UserNotFound);
        };

        sqlx::query("UPDATE users SET phone = ?, updated_at = NOW() WHERE id = ?")
            .bind(phone)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE eb_consumers SET phone = ? WHERE id = ?")
            .bind(phone)
            .bind(eb_consumer_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Phone updated in both tables for user {}", user_id);
        Ok(())
    }
}
