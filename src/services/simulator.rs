//! Synthetic meter-data generator.
//!
//! A background task that periodically writes a plausible reading for every
//! non-provider account. It drives the ledger through its normal ingestion
//! entry point and shares no other state with the settlement core.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::services::ledger::LedgerService;

pub struct MeterSimulator {
    db: PgPool,
    ledger: LedgerService,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl MeterSimulator {
    pub fn new(db: PgPool, ledger: LedgerService, interval_secs: u64) -> Self {
        Self {
            db,
            ledger,
            interval: Duration::from_secs(interval_secs.max(1)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn the generator loop. The first tick fires immediately so the
    /// market has data right after startup; a failing tick is logged and
    /// the loop keeps going.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        self.running.store(true, Ordering::Relaxed);
        let sim = Arc::clone(self);
        info!(interval_secs = sim.interval.as_secs(), "meter simulator started");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sim.interval);
            while sim.running.load(Ordering::Relaxed) {
                ticker.tick().await;
                if !sim.running.load(Ordering::Relaxed) {
                    break;
                }
                if let Err(err) = sim.tick().await {
                    warn!(error = %err, "meter simulator tick failed");
                }
            }
            info!("meter simulator stopped");
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// One iteration: a fresh reading for every household account.
    async fn tick(&self) -> Result<()> {
        let households = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM accounts WHERE role != 'provider' ORDER BY created_at ASC",
        )
        .fetch_all(&self.db)
        .await?;

        let now = Utc::now();
        let mut rng = StdRng::from_entropy();
        for account_id in households {
            // Simple random model: solar-ish production, household-ish load
            let produced = rng.gen_range(0.0..4.0_f64);
            let consumed = rng.gen_range(0.5..3.5_f64);
            self.ledger
                .record_reading(
                    account_id,
                    kwh_from_f64(produced),
                    kwh_from_f64(consumed),
                    now,
                )
                .await?;
        }
        debug!("meter simulator tick completed");
        Ok(())
    }
}

fn kwh_from_f64(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(3)
        .max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_quantities_are_non_negative_and_rounded() {
        let v = kwh_from_f64(3.14159265);
        assert_eq!(v, Decimal::new(3142, 3));
        assert_eq!(kwh_from_f64(-1.0), Decimal::ZERO);
        assert_eq!(kwh_from_f64(f64::NAN), Decimal::ZERO);
    }
}
