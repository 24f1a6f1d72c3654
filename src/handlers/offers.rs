use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::Result;
use crate::models::{Offer, Trade};

#[derive(Debug, Deserialize)]
pub struct CreateOfferRequest {
    pub seller_id: Uuid,
    pub kwh: Decimal,
    pub price_per_kwh: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct AcceptOfferRequest {
    pub buyer_id: Uuid,
    pub kwh: Decimal,
    /// Opaque audit string (e.g. an external transaction hash); stored as-is
    pub audit_token: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateOfferRequest>,
) -> Result<Json<Offer>> {
    let offer = state
        .offer_book
        .create_offer(payload.seller_id, payload.kwh, payload.price_per_kwh)
        .await?;
    Ok(Json(offer))
}

pub async fn accept(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
    Json(payload): Json<AcceptOfferRequest>,
) -> Result<Json<Trade>> {
    let trade = state
        .settlement
        .accept_offer(payload.buyer_id, offer_id, payload.kwh, payload.audit_token)
        .await?;
    Ok(Json(trade))
}
