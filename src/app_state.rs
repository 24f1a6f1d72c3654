//! Application state shared across all handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    AccountService, LedgerService, MarketService, OfferBookService, PricingOracle,
    SettlementService,
};

/// Shared handles for request processing: the connection pool,
/// configuration, and one instance of each core service.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Config,
    pub accounts: AccountService,
    pub ledger: LedgerService,
    /// Process-lifetime pricing oracle; the surge hour is drawn once at
    /// construction and shared by every handler
    pub pricing: Arc<PricingOracle>,
    pub offer_book: OfferBookService,
    pub settlement: SettlementService,
    pub market: MarketService,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, config: Config) -> Self {
        let window_hours = config.market.surplus_window_hours;
        let ledger = LedgerService::new(db.clone(), window_hours);
        let accounts = AccountService::new(db.clone(), ledger.clone());
        let pricing = Arc::new(PricingOracle::from_config(&config.market));
        let offer_book = OfferBookService::new(db.clone(), window_hours);
        let settlement = SettlementService::new(db.clone(), config.market.platform_fee_rate);
        let market = MarketService::new(
            offer_book.clone(),
            Arc::clone(&pricing),
            config.market.provider_names.clone(),
        );

        Self {
            db,
            config,
            accounts,
            ledger,
            pricing,
            offer_book,
            settlement,
            market,
        }
    }
}
