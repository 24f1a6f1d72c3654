//! Offer book: lifecycle of household sell offers.
//!
//! Admission upholds the system's central invariant: for every seller, the
//! sum of `kwh_remaining` over active offers never exceeds the surplus the
//! ledger reports at check time.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::{Account, Offer};
use crate::services::ledger::{LedgerService, available_from};
use crate::services::{epsilon, round4};

#[derive(Clone)]
pub struct OfferBookService {
    db: PgPool,
    window_hours: i64,
}

impl OfferBookService {
    pub fn new(db: PgPool, window_hours: i64) -> Self {
        Self { db, window_hours }
    }

    /// Create a sell offer after a fresh availability check.
    ///
    /// The seller's account row is locked for the duration of the
    /// transaction, so two concurrent creations by the same seller cannot
    /// both pass the check and jointly over-reserve. Different sellers do
    /// not contend.
    pub async fn create_offer(
        &self,
        seller_id: Uuid,
        kwh: Decimal,
        price_per_kwh: Decimal,
    ) -> Result<Offer> {
        if kwh <= Decimal::ZERO || price_per_kwh <= Decimal::ZERO {
            return Err(ApiError::InvalidArgument(
                "kWh and price must be positive".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let seller = sqlx::query_as::<_, Account>(
            "SELECT id, email, wallet, role, balance, created_at
             FROM accounts WHERE id = $1 FOR UPDATE",
        )
        .bind(seller_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("seller"))?;

        if !seller.role.can_sell() {
            return Err(ApiError::InvalidArgument(
                "only producers or both-role accounts can create offers".to_string(),
            ));
        }

        let stored = LedgerService::windowed_surplus_on(&mut *tx, seller_id, self.window_hours).await?;
        let reserved = LedgerService::reserved_energy_on(&mut *tx, seller_id).await?;
        let available = round4(stored - reserved);
        if kwh > available + epsilon() {
            return Err(ApiError::InsufficientSurplus {
                available: available_from(stored, reserved),
            });
        }

        let offer = sqlx::query_as::<_, Offer>(
            "INSERT INTO offers (id, seller_id, kwh_total, kwh_remaining, price_per_kwh, status, created_at)
             VALUES ($1, $2, $3, $3, $4, 'active', $5)
             RETURNING id, seller_id, kwh_total, kwh_remaining, price_per_kwh, status, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(seller_id)
        .bind(round4(kwh))
        .bind(round4(price_per_kwh))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            offer_id = %offer.id,
            seller_id = %seller_id,
            kwh = %offer.kwh_total,
            price = %offer.price_per_kwh,
            "offer created"
        );
        Ok(offer)
    }

    /// Active offers with energy left, cheapest first, freshest first among
    /// equally priced ones.
    pub async fn list_active_offers(&self, limit: i64) -> Result<Vec<Offer>> {
        let offers = sqlx::query_as::<_, Offer>(
            "SELECT id, seller_id, kwh_total, kwh_remaining, price_per_kwh, status, created_at
             FROM offers
             WHERE status = 'active' AND kwh_remaining > 0
             ORDER BY price_per_kwh ASC, created_at DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(offers)
    }
}
