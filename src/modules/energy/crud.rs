use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{MySql, Pool};

pub struct EnergyCrud {
    pool: Pool<MySql>,
}

impl EnergyCrud {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// Latest cumulative reading for a meter, if any exists yet.
    pub async fn latest_cumulative(&self, meter_id: &str) -> Result<Option<Decimal>, sqlx::Error> {
        let row: Option<(Decimal,)> = sqlx::query_as(
            r#"
            SELECT cumulative_units
            FROM energy_readings
            WHERE meter_id = ?
            ORDER BY reading_date DESC
            LIMIT 1
            "#,
        )
        .bind(meter_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(units,)| units))
    }

    pub async fn insert_reading(
        &self,
        meter_id: &str,
        cumulative_units: Decimal,
        reading_date: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO energy_readings (meter_id, cumulative_units, data_source, reading_date)
            VALUES (?, ?, 'SIMULATION', ?)
            "#,
        )
        .bind(meter_id)
        .bind(cumulative_units)
        .bind(reading_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
