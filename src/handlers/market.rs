use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::Result;
use crate::models::MarketItem;

#[derive(Debug, Deserialize)]
pub struct MarketQuery {
    /// Max household offers to include alongside the providers
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PriceSeriesQuery {
    pub hours: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PricePoint {
    pub ts: DateTime<Utc>,
    pub price_per_kwh: Decimal,
}

pub async fn list_market(
    State(state): State<AppState>,
    Query(query): Query<MarketQuery>,
) -> Result<Json<Vec<MarketItem>>> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    Ok(Json(state.market.list_market(limit).await?))
}

pub async fn provider_price_series(
    State(state): State<AppState>,
    Query(query): Query<PriceSeriesQuery>,
) -> Result<Json<Vec<PricePoint>>> {
    let hours = query.hours.unwrap_or(24).clamp(1, 24 * 7);
    let series = state
        .pricing
        .hourly_series(hours)
        .into_iter()
        .map(|(ts, price_per_kwh)| PricePoint { ts, price_per_kwh })
        .collect();
    Ok(Json(series))
}
