use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A pre-existing electricity connection, provisioned by the utility.
/// Referenced, never created, by this service. Immutable except `phone`
/// (synchronized from the linked account) and `status`.
#[derive(Debug, Clone, FromRow)]
pub struct EbConsumer {
    pub id: u64,
    pub meter_id: String,
    pub phone: String,
    pub consumer_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ActiveConsumer {
    pub meter_id: String,
    pub consumer_type: String,
}
