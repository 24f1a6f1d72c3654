use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One time-series reading from a household meter. Append-only and
/// immutable once written; ordering is by `ts` per account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MeterReading {
    pub id: Uuid,
    pub account_id: Uuid,
    pub produced_kwh: Decimal,
    pub consumed_kwh: Decimal,
    pub ts: DateTime<Utc>,
}

/// Chart-friendly projection of a reading, used by the meter series endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MeterSeriesPoint {
    pub ts: DateTime<Utc>,
    pub produced_kwh: Decimal,
    pub consumed_kwh: Decimal,
}
