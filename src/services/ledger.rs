//! Surplus ledger: turns raw meter history into the energy an account is
//! currently entitled to sell.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::{MeterReading, MeterSeriesPoint};
use crate::services::round4;

#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
    window_hours: i64,
}

impl LedgerService {
    pub fn new(db: PgPool, window_hours: i64) -> Self {
        Self { db, window_hours }
    }

    /// Append one meter reading. Values must be non-negative and the account
    /// must exist. Out-of-order timestamps are accepted on purpose so that
    /// history can be backfilled.
    pub async fn record_reading(
        &self,
        account_id: Uuid,
        produced_kwh: Decimal,
        consumed_kwh: Decimal,
        ts: DateTime<Utc>,
    ) -> Result<MeterReading> {
        if produced_kwh < Decimal::ZERO || consumed_kwh < Decimal::ZERO {
            return Err(ApiError::InvalidArgument(
                "energy values must be non-negative".to_string(),
            ));
        }

        let exists = sqlx::query_scalar::<_, i32>("SELECT 1 FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(&self.db)
            .await?;
        if exists.is_none() {
            return Err(ApiError::not_found("account"));
        }

        let reading = sqlx::query_as::<_, MeterReading>(
            "INSERT INTO meter_readings (id, account_id, produced_kwh, consumed_kwh, ts)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, account_id, produced_kwh, consumed_kwh, ts",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(produced_kwh)
        .bind(consumed_kwh)
        .bind(ts)
        .fetch_one(&self.db)
        .await?;

        debug!(%account_id, reading_id = %reading.id, "meter reading recorded");
        Ok(reading)
    }

    /// Surplus of the single most recent reading, 0 if none exist.
    pub async fn latest_surplus(&self, account_id: Uuid) -> Result<Decimal> {
        let row = sqlx::query_as::<_, (Decimal, Decimal)>(
            "SELECT produced_kwh, consumed_kwh FROM meter_readings
             WHERE account_id = $1
             ORDER BY ts DESC
             LIMIT 1",
        )
        .bind(account_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(match row {
            Some((produced, consumed)) => round4(reading_surplus(produced, consumed)),
            None => Decimal::ZERO,
        })
    }

    /// Surplus accumulated over the trailing window.
    pub async fn windowed_surplus(&self, account_id: Uuid) -> Result<Decimal> {
        Self::windowed_surplus_on(&self.db, account_id, self.window_hours).await
    }

    /// Sum of `kwh_remaining` across the account's active offers.
    pub async fn reserved_energy(&self, account_id: Uuid) -> Result<Decimal> {
        Self::reserved_energy_on(&self.db, account_id).await
    }

    /// Windowed surplus net of active reservations, clamped at zero.
    pub async fn available_to_sell(&self, account_id: Uuid) -> Result<Decimal> {
        let stored = self.windowed_surplus(account_id).await?;
        let reserved = self.reserved_energy(account_id).await?;
        Ok(available_from(stored, reserved))
    }

    /// Readings for the account since `since`, ascending by timestamp.
    pub async fn meter_series(
        &self,
        account_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<MeterSeriesPoint>> {
        let points = sqlx::query_as::<_, MeterSeriesPoint>(
            "SELECT ts, produced_kwh, consumed_kwh FROM meter_readings
             WHERE account_id = $1 AND ts >= $2
             ORDER BY ts ASC",
        )
        .bind(account_id)
        .bind(since)
        .fetch_all(&self.db)
        .await?;
        Ok(points)
    }

    /// Windowed surplus computed on an arbitrary executor, so the offer
    /// book can re-read it inside its admission transaction.
    ///
    /// This sums per-reading `max(0, produced - consumed)` point samples.
    /// Readings are treated as independent events, not as rates over an
    /// interval, so this is deliberately not a time integral of power.
    pub async fn windowed_surplus_on<'e>(
        executor: impl PgExecutor<'e>,
        account_id: Uuid,
        window_hours: i64,
    ) -> Result<Decimal> {
        let since = Utc::now() - Duration::hours(window_hours);
        let rows = sqlx::query_as::<_, (Decimal, Decimal)>(
            "SELECT produced_kwh, consumed_kwh FROM meter_readings
             WHERE account_id = $1 AND ts >= $2",
        )
        .bind(account_id)
        .bind(since)
        .fetch_all(executor)
        .await?;

        Ok(window_surplus_sum(rows.into_iter()))
    }

    /// Active reservation total computed on an arbitrary executor.
    pub async fn reserved_energy_on<'e>(
        executor: impl PgExecutor<'e>,
        account_id: Uuid,
    ) -> Result<Decimal> {
        let reserved = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(kwh_remaining), 0) FROM offers
             WHERE seller_id = $1 AND status = 'active'",
        )
        .bind(account_id)
        .fetch_one(executor)
        .await?;
        Ok(round4(reserved))
    }
}

/// `max(0, produced - consumed)` for a single reading.
pub(crate) fn reading_surplus(produced: Decimal, consumed: Decimal) -> Decimal {
    (produced - consumed).max(Decimal::ZERO)
}

/// Sum of point-sample surpluses over a set of readings.
pub(crate) fn window_surplus_sum(readings: impl Iterator<Item = (Decimal, Decimal)>) -> Decimal {
    let total = readings
        .map(|(produced, consumed)| reading_surplus(produced, consumed))
        .sum();
    round4(total)
}

/// `max(0, stored - reserved)`, rounded.
pub(crate) fn available_from(stored: Decimal, reserved: Decimal) -> Decimal {
    round4(stored - reserved).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn reading_surplus_clamps_deficits_to_zero() {
        assert_eq!(reading_surplus(d("5"), d("2")), d("3"));
        assert_eq!(reading_surplus(d("1"), d("4")), Decimal::ZERO);
    }

    #[test]
    fn window_sum_ignores_deficit_readings() {
        // A deficit in one interval must not eat into surplus from another:
        // each reading is an independent point sample.
        let readings = vec![(d("5"), d("2")), (d("0.5"), d("3")), (d("2"), d("1.5"))];
        assert_eq!(window_surplus_sum(readings.into_iter()), d("3.5"));
    }

    #[test]
    fn window_sum_of_nothing_is_zero() {
        assert_eq!(window_surplus_sum(std::iter::empty()), Decimal::ZERO);
    }

    #[test]
    fn available_is_stored_minus_reserved_clamped() {
        assert_eq!(available_from(d("3"), Decimal::ZERO), d("3"));
        assert_eq!(available_from(d("3"), d("3")), Decimal::ZERO);
        // Over-reservation (possible transiently through rounding) never
        // reports negative availability
        assert_eq!(available_from(d("3"), d("4")), Decimal::ZERO);
    }
}
