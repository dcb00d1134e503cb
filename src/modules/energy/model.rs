use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct EnergyReading {
    pub id: u64,
    pub meter_id: String,
    pub cumulative_units: Decimal,
    pub data_source: String,
    pub reading_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
