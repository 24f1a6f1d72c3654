use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::error::{ApiError, Result};
use crate::models::{Account, AccountRole};
use crate::services::accounts::{AccountStatus, AccountStatusExtended};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterAccountRequest {
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub wallet: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct FundAccountRequest {
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct FundAccountResponse {
    pub account_id: Uuid,
    pub balance: Decimal,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterAccountRequest>,
) -> Result<Json<Account>> {
    payload
        .validate()
        .map_err(|e| ApiError::InvalidArgument(e.to_string()))?;
    let role: AccountRole = payload.role.parse().map_err(ApiError::InvalidArgument)?;

    let account = state
        .accounts
        .register(&payload.email, &payload.wallet, role)
        .await?;
    Ok(Json(account))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Account>>> {
    Ok(Json(state.accounts.list().await?))
}

pub async fn fund(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<FundAccountRequest>,
) -> Result<Json<FundAccountResponse>> {
    let balance = state.accounts.fund(account_id, payload.amount).await?;
    Ok(Json(FundAccountResponse {
        account_id,
        balance,
    }))
}

pub async fn status(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<AccountStatus>> {
    Ok(Json(state.accounts.status(account_id).await?))
}

pub async fn status_extended(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<AccountStatusExtended>> {
    Ok(Json(state.accounts.status_extended(account_id).await?))
}
