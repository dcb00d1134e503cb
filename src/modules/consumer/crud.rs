use sqlx::{MySql, Pool};

use super::model::{ActiveConsumer, EbConsumer};
use crate::services::phone::IdentifierForms;

pub struct ConsumerCrud {
    pool: Pool<MySql>,
}

impl ConsumerCrud {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// Resolve a user-supplied identifier to a consumer record: meter id,
    /// canonical phone, or last-10-digit phone fallback, combined in one
    /// OR-predicate. At most one logical match is expected; ORDER BY id
    /// makes a historical last-10 collision resolve deterministically.
    pub async fn resolve(&self, forms: &IdentifierForms) -> Result<Option<EbConsumer>, sqlx::Error> {
        sqlx::query_as::<_, EbConsumer>(
            r#"
            SELECT id, meter_id, phone, consumer_type, status, created_at
            FROM eb_consumers
            WHERE meter_id = ?
               OR phone = ?
               OR RIGHT(REPLACE(REPLACE(REPLACE(phone, '+', ''), '-', ''), ' ', ''), 10) = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(&forms.upper)
        .bind(forms.canonical_phone.as_deref().unwrap_or(""))
        .bind(forms.last10.as_deref().unwrap_or(""))
        .fetch_optional(&self.pool)
        .await
    }

    /// Phone lookup for OTP issuance. LEFT JOIN so both registered
    /// accounts (matched by email) and not-yet-registered consumers
    /// resolve here.
    pub async fn resolve_phone(
        &self,
        forms: &IdentifierForms,
    ) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT e.phone
            FROM eb_consumers e
            LEFT JOIN users u ON u.eb_consumer_id = e.id
            WHERE LOWER(u.email) = ?
               OR e.phone = ?
               OR RIGHT(REPLACE(REPLACE(REPLACE(e.phone, '+', ''), '-', ''), ' ', ''), 10) = ?
               OR e.meter_id = ?
            ORDER BY e.id
            LIMIT 1
            "#,
        )
        .bind(&forms.lower)
        .bind(forms.canonical_phone.as_deref().unwrap_or(""))
        .bind(forms.last10.as_deref().unwrap_or(""))
        .bind(&forms.upper)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(phone,)| phone))
    }

    /// Meters the simulator generates readings for.
    pub async fn list_active(&self) -> Result<Vec<ActiveConsumer>, sqlx::Error> {
        sqlx::query_as::<_, ActiveConsumer>(
            "SELECT meter_id, consumer_type FROM eb_consumers WHERE status = 'ACTIVE'",
        )
        .fetch_all(&self.pool)
        .await
    }
}
