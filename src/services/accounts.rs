//! Account registration, funding, and status views.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::{Account, AccountRole};
use crate::services::ledger::LedgerService;
use crate::services::round4;

/// Wallet balance plus available-to-sell surplus.
#[derive(Debug, Clone, Serialize)]
pub struct AccountStatus {
    pub account_id: Uuid,
    pub available_kwh: Decimal,
    pub balance: Decimal,
}

/// Status with the surplus computation broken out for dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct AccountStatusExtended {
    pub account_id: Uuid,
    pub stored_window_kwh: Decimal,
    pub reserved_kwh: Decimal,
    pub available_kwh: Decimal,
    pub balance: Decimal,
}

#[derive(Clone)]
pub struct AccountService {
    db: PgPool,
    ledger: LedgerService,
}

impl AccountService {
    pub fn new(db: PgPool, ledger: LedgerService) -> Self {
        Self { db, ledger }
    }

    pub async fn register(&self, email: &str, wallet: &str, role: AccountRole) -> Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (id, email, wallet, role, balance, created_at)
             VALUES ($1, $2, $3, $4, 0, $5)
             RETURNING id, email, wallet, role, balance, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(wallet)
        .bind(role.to_string())
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;

        info!(account_id = %account.id, role = %role, "account registered");
        Ok(account)
    }

    pub async fn list(&self) -> Result<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(
            "SELECT id, email, wallet, role, balance, created_at
             FROM accounts ORDER BY created_at ASC",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(accounts)
    }

    pub async fn get(&self, account_id: Uuid) -> Result<Account> {
        sqlx::query_as::<_, Account>(
            "SELECT id, email, wallet, role, balance, created_at
             FROM accounts WHERE id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::not_found("account"))
    }

    /// Credit the account's balance. Locks the account row so concurrent
    /// funding and settlement of the same account serialize.
    pub async fn fund(&self, account_id: Uuid, amount: Decimal) -> Result<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(ApiError::InvalidArgument(
                "amount must be positive".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let balance =
            sqlx::query_scalar::<_, Decimal>("SELECT balance FROM accounts WHERE id = $1 FOR UPDATE")
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| ApiError::not_found("account"))?;

        let new_balance = round4(balance + amount);
        sqlx::query("UPDATE accounts SET balance = $1 WHERE id = $2")
            .bind(new_balance)
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(%account_id, %amount, %new_balance, "account funded");
        Ok(new_balance)
    }

    pub async fn status(&self, account_id: Uuid) -> Result<AccountStatus> {
        let account = self.get(account_id).await?;
        let available = self.ledger.available_to_sell(account_id).await?;
        Ok(AccountStatus {
            account_id,
            available_kwh: available,
            balance: round4(account.balance),
        })
    }

    pub async fn status_extended(&self, account_id: Uuid) -> Result<AccountStatusExtended> {
        let account = self.get(account_id).await?;
        let stored = self.ledger.windowed_surplus(account_id).await?;
        let reserved = self.ledger.reserved_energy(account_id).await?;
        let available = self.ledger.available_to_sell(account_id).await?;
        Ok(AccountStatusExtended {
            account_id,
            stored_window_kwh: stored,
            reserved_kwh: reserved,
            available_kwh: available,
            balance: round4(account.balance),
        })
    }

    /// Ensure one provider-role account exists per configured provider
    /// name. Idempotent; runs at startup.
    pub async fn seed_providers(&self, provider_names: &[String]) -> Result<()> {
        for name in provider_names {
            let exists = sqlx::query_scalar::<_, i32>(
                "SELECT 1 FROM accounts WHERE role = 'provider' AND email = $1",
            )
            .bind(name)
            .fetch_optional(&self.db)
            .await?;

            if exists.is_none() {
                sqlx::query(
                    "INSERT INTO accounts (id, email, wallet, role, balance, created_at)
                     VALUES ($1, $2, '', 'provider', 0, $3)",
                )
                .bind(Uuid::new_v4())
                .bind(name)
                .bind(Utc::now())
                .execute(&self.db)
                .await?;
                info!(provider = %name, "seeded provider account");
            }
        }
        Ok(())
    }
}
