use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::Result;
use crate::models::{MeterReading, MeterSeriesPoint};

#[derive(Debug, Deserialize)]
pub struct RecordReadingRequest {
    pub account_id: Uuid,
    pub produced_kwh: Decimal,
    pub consumed_kwh: Decimal,
    /// Defaults to now; explicit timestamps let history be backfilled
    pub ts: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    /// Trailing hours of history to return
    pub hours: Option<i64>,
}

pub async fn record(
    State(state): State<AppState>,
    Json(payload): Json<RecordReadingRequest>,
) -> Result<Json<MeterReading>> {
    let ts = payload.ts.unwrap_or_else(Utc::now);
    let reading = state
        .ledger
        .record_reading(
            payload.account_id,
            payload.produced_kwh,
            payload.consumed_kwh,
            ts,
        )
        .await?;
    Ok(Json(reading))
}

pub async fn series(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<Vec<MeterSeriesPoint>>> {
    let hours = query.hours.unwrap_or(12).clamp(1, 24 * 7);
    let since = Utc::now() - Duration::hours(hours);
    Ok(Json(state.ledger.meter_series(account_id, since).await?))
}
