//! Settlement engine: atomic exchange of offer capacity for money.
//!
//! `accept_offer` is the single most safety-critical operation in the
//! system. Everything happens inside one database transaction; a failure at
//! any validation step rolls back with no entity touched.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::{Offer, OfferStatus, Trade};
use crate::services::{epsilon, round4};

#[derive(Clone)]
pub struct SettlementService {
    db: PgPool,
    /// Configured platform fee rate. Deliberately not applied: buyer debit
    /// and seller credit are the identical amount today. Kept so enabling
    /// the fee later is a local change to `trade_cost`.
    #[allow(dead_code)]
    platform_fee_rate: Decimal,
}

impl SettlementService {
    pub fn new(db: PgPool, platform_fee_rate: Decimal) -> Self {
        Self {
            db,
            platform_fee_rate,
        }
    }

    /// Buy `requested_kwh` (clamped to what is left) from an active offer.
    ///
    /// Locking discipline: the offer row first, then both account rows in
    /// ascending-id order. Updates to one offer's `kwh_remaining` and to
    /// one buyer's balance are thereby linearized without serializing
    /// unrelated trades.
    pub async fn accept_offer(
        &self,
        buyer_id: Uuid,
        offer_id: Uuid,
        requested_kwh: Decimal,
        audit_token: Option<String>,
    ) -> Result<Trade> {
        if requested_kwh <= Decimal::ZERO {
            return Err(ApiError::InvalidArgument(
                "kWh must be positive".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let offer = sqlx::query_as::<_, Offer>(
            "SELECT id, seller_id, kwh_total, kwh_remaining, price_per_kwh, status, created_at
             FROM offers WHERE id = $1 FOR UPDATE",
        )
        .bind(offer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("offer"))?;

        if offer.status != OfferStatus::Active {
            return Err(ApiError::OfferUnavailable(format!(
                "offer is {}",
                offer.status
            )));
        }

        let buyer_exists = sqlx::query_scalar::<_, i32>("SELECT 1 FROM accounts WHERE id = $1")
            .bind(buyer_id)
            .fetch_optional(&mut *tx)
            .await?;
        if buyer_exists.is_none() {
            return Err(ApiError::not_found("buyer"));
        }

        if offer.seller_id == buyer_id {
            return Err(ApiError::SelfTrade);
        }

        // Ascending-id lock order keeps concurrent settlements that touch
        // the same pair of accounts from deadlocking.
        let balances = sqlx::query_as::<_, (Uuid, Decimal)>(
            "SELECT id, balance FROM accounts
             WHERE id = $1 OR id = $2
             ORDER BY id
             FOR UPDATE",
        )
        .bind(buyer_id)
        .bind(offer.seller_id)
        .fetch_all(&mut *tx)
        .await?;

        let buyer_balance = balance_of(&balances, buyer_id)
            .ok_or_else(|| ApiError::not_found("buyer"))?;
        let seller_balance = balance_of(&balances, offer.seller_id)
            .ok_or_else(|| ApiError::not_found("seller"))?;

        let quantity = clamp_fill(requested_kwh, offer.kwh_remaining);
        if quantity <= Decimal::ZERO {
            return Err(ApiError::OfferUnavailable(
                "no remaining kWh in this offer".to_string(),
            ));
        }

        let cost = trade_cost(quantity, offer.price_per_kwh);
        if buyer_balance + epsilon() < cost {
            return Err(ApiError::InsufficientFunds { needed: cost });
        }

        // Debit and credit the identical amount: conservation is exact.
        sqlx::query("UPDATE accounts SET balance = $1 WHERE id = $2")
            .bind(round4(buyer_balance - cost))
            .bind(buyer_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE accounts SET balance = $1 WHERE id = $2")
            .bind(round4(seller_balance + cost))
            .bind(offer.seller_id)
            .execute(&mut *tx)
            .await?;

        let (new_remaining, new_status) = drain_offer(offer.kwh_remaining, quantity);
        sqlx::query("UPDATE offers SET kwh_remaining = $1, status = $2 WHERE id = $3")
            .bind(new_remaining)
            .bind(new_status.to_string())
            .bind(offer.id)
            .execute(&mut *tx)
            .await?;

        let trade = sqlx::query_as::<_, Trade>(
            "INSERT INTO trades (id, offer_id, buyer_id, kwh, total_price, audit_token, executed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, offer_id, buyer_id, kwh, total_price, audit_token, executed_at",
        )
        .bind(Uuid::new_v4())
        .bind(offer.id)
        .bind(buyer_id)
        .bind(quantity)
        .bind(cost)
        .bind(audit_token)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            trade_id = %trade.id,
            offer_id = %offer.id,
            buyer_id = %buyer_id,
            kwh = %quantity,
            total = %cost,
            "trade settled"
        );
        Ok(trade)
    }

    /// Trades bought by the account, newest first.
    pub async fn list_trades(&self, buyer_id: Uuid, limit: i64) -> Result<Vec<Trade>> {
        let trades = sqlx::query_as::<_, Trade>(
            "SELECT id, offer_id, buyer_id, kwh, total_price, audit_token, executed_at
             FROM trades
             WHERE buyer_id = $1
             ORDER BY executed_at DESC
             LIMIT $2",
        )
        .bind(buyer_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(trades)
    }
}

fn balance_of(balances: &[(Uuid, Decimal)], id: Uuid) -> Option<Decimal> {
    balances
        .iter()
        .find(|(row_id, _)| *row_id == id)
        .map(|(_, balance)| *balance)
}

/// Fill quantity: the request clamped to what the offer still holds.
pub(crate) fn clamp_fill(requested: Decimal, remaining: Decimal) -> Decimal {
    requested.min(remaining)
}

/// `quantity * unit price`, rounded to 4 decimals.
pub(crate) fn trade_cost(quantity: Decimal, price_per_kwh: Decimal) -> Decimal {
    round4(quantity * price_per_kwh)
}

/// Post-fill remaining quantity and status. A residue at or below epsilon
/// is clamped to exactly zero and the offer transitions to `closed`, its
/// fully-filled terminal state.
pub(crate) fn drain_offer(remaining: Decimal, quantity: Decimal) -> (Decimal, OfferStatus) {
    let left = round4(remaining - quantity);
    if left <= epsilon() {
        (Decimal::ZERO, OfferStatus::Closed)
    } else {
        (left, OfferStatus::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn fill_is_clamped_to_remaining() {
        assert_eq!(clamp_fill(d("5"), d("3")), d("3"));
        assert_eq!(clamp_fill(d("2"), d("3")), d("2"));
        assert_eq!(clamp_fill(d("2"), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn cost_is_quantity_times_price_rounded() {
        // 3 kWh at 0.10 EUR/kWh -> 0.30 EUR
        assert_eq!(trade_cost(d("3"), d("0.10")), d("0.3000"));
        assert_eq!(trade_cost(d("1.2345"), d("0.3333")), d("0.4115"));
    }

    #[test]
    fn exhausted_offer_closes_with_exact_zero() {
        let (left, status) = drain_offer(d("3"), d("3"));
        assert_eq!(left, Decimal::ZERO);
        assert_eq!(status, OfferStatus::Closed);
    }

    #[test]
    fn sub_epsilon_residue_is_clamped_to_zero() {
        let (left, status) = drain_offer(d("3.00000000001"), d("3"));
        assert_eq!(left, Decimal::ZERO);
        assert_eq!(status, OfferStatus::Closed);
    }

    #[test]
    fn partial_fill_keeps_offer_active() {
        let (left, status) = drain_offer(d("3"), d("1"));
        assert_eq!(left, d("2"));
        assert_eq!(status, OfferStatus::Active);
    }

    #[test]
    fn conservation_arithmetic_for_a_full_fill() {
        // Buyer with 1.00 EUR accepts 3 kWh at 0.10 EUR/kWh
        let cost = trade_cost(d("3"), d("0.10"));
        let buyer_after = round4(d("1.00") - cost);
        let seller_after = round4(Decimal::ZERO + cost);
        assert_eq!(buyer_after, d("0.70"));
        assert_eq!(seller_after, d("0.30"));
        // debit and credit are the identical value
        assert_eq!(d("1.00") - buyer_after, seller_after);
    }

    #[test]
    fn underfunded_buyer_fails_the_balance_check() {
        let cost = trade_cost(d("3"), d("0.10"));
        let balance = d("0.10");
        assert!(balance + crate::services::epsilon() < cost);
    }

    proptest! {
        #[test]
        fn remaining_never_goes_negative(
            remaining_cents in 1u64..1_000_000,
            requested_cents in 1u64..1_000_000,
        ) {
            let remaining = Decimal::new(remaining_cents as i64, 4);
            let requested = Decimal::new(requested_cents as i64, 4);
            let quantity = clamp_fill(requested, remaining);
            let (left, status) = drain_offer(remaining, quantity);
            prop_assert!(left >= Decimal::ZERO);
            prop_assert!(left <= remaining);
            if left == Decimal::ZERO {
                prop_assert_eq!(status, OfferStatus::Closed);
            } else {
                prop_assert_eq!(status, OfferStatus::Active);
            }
        }

        #[test]
        fn cost_is_non_negative_and_rounded(
            qty_cents in 1u64..1_000_000,
            price_cents in 1u64..100_000,
        ) {
            let cost = trade_cost(
                Decimal::new(qty_cents as i64, 4),
                Decimal::new(price_cents as i64, 4),
            );
            prop_assert!(cost >= Decimal::ZERO);
            prop_assert!(cost.scale() <= 4);
        }
    }
}
