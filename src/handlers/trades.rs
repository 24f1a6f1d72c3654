use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::Result;
use crate::models::Trade;

#[derive(Debug, Deserialize)]
pub struct TradesQuery {
    pub limit: Option<i64>,
}

pub async fn list_for_buyer(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Query(query): Query<TradesQuery>,
) -> Result<Json<Vec<Trade>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    Ok(Json(state.settlement.list_trades(account_id, limit).await?))
}
