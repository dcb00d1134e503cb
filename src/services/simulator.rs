use std::time::Duration;

use chrono::{Datelike, Timelike, Utc, Weekday};
use rand::Rng;
use rust_decimal::Decimal;
use sqlx::{MySql, Pool};

use crate::modules::consumer::crud::ConsumerCrud;
use crate::modules::energy::crud::EnergyCrud;
use crate::services::email_verification::EmailVerificationCoordinator;

/// Detached background job: synthesizes a cumulative per-meter reading for
/// every ACTIVE consumer on a fixed interval, and opportunistically sweeps
/// expired verification tokens on the same tick. Runs under tokio::spawn;
/// never blocks request handling.
pub struct EnergySimulator {
    db: Pool<MySql>,
    interval_minutes: u64,
}

impl EnergySimulator {
    pub fn new(db: Pool<MySql>, interval_minutes: u64) -> Self {
        Self {
            db,
            interval_minutes: interval_minutes.max(1),
        }
    }

    pub async fn run(&self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_minutes * 60));
        tracing::info!(
            "Energy simulation started (every {} minutes)",
            self.interval_minutes
        );

        loop {
            interval.tick().await;

            if let Err(e) = self.generate_readings().await {
                tracing::error!("Energy simulation tick failed: {}", e);
            }

            match EmailVerificationCoordinator::sweep_expired(&self.db).await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Swept {} expired verification tokens", n),
                Err(e) => tracing::error!("Token sweep failed: {}", e),
            }
        }
    }

    async fn generate_readings(&self) -> Result<(), sqlx::Error> {
        let consumer_crud = ConsumerCrud::new(self.db.clone());
        let energy_crud = EnergyCrud::new(self.db.clone());

        let consumers = consumer_crud.list_active().await?;
        let now = Utc::now();

        let mut errors = 0usize;
        for consumer in &consumers {
            let cumulative = match energy_crud.latest_cumulative(&consumer.meter_id).await? {
                Some(previous) => previous + hourly_draw(&consumer.consumer_type),
                // First reading for this meter starts from a plausible base.
                None => {
                    Decimal::from_f64_retain(100.0 + rand::rng().random_range(0.0..500.0))
                        .unwrap_or_default()
                }
            };

            if let Err(e) = energy_crud
                .insert_reading(&consumer.meter_id, cumulative.round_dp(2), now)
                .await
            {
                tracing::error!("Reading insert failed for {}: {}", consumer.meter_id, e);
                errors += 1;
            }
        }

        tracing::info!(
            "Simulation tick complete: {} meters, {} errors",
            consumers.len(),
            errors
        );
        Ok(())
    }
}

/// One interval's consumption in kWh. Cosmetic model: a per-type base by
/// time of day, a weekend adjustment, and ±20% jitter.
fn hourly_draw(consumer_type: &str) -> Decimal {
    let now = Utc::now();
    let hour = now.hour();
    let weekend = matches!(now.weekday(), Weekday::Sat | Weekday::Sun);

    let base = match consumer_type {
        "COMMERCIAL" => {
            let day_rate = if (9..17).contains(&hour) { 2.0 } else { 0.5 };
            if weekend {
                day_rate * 0.2
            } else {
                day_rate
            }
        }
        _ => {
            let day_rate = match hour {
                6..=8 => 0.8,
                9..=16 => 0.5,
                17..=21 => 1.2,
                _ => 0.3,
            };
            if weekend {
                day_rate * 1.3
            } else {
                day_rate
            }
        }
    };

    let jitter = rand::rng().random_range(0.8..1.2);
    Decimal::from_f64_retain(base * jitter).unwrap_or_default()
}
