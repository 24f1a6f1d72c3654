pub mod accounts;
pub mod ledger;
pub mod market;
pub mod offer_book;
pub mod pricing;
pub mod settlement;
pub mod simulator;

pub use accounts::AccountService;
pub use ledger::LedgerService;
pub use market::MarketService;
pub use offer_book::OfferBookService;
pub use pricing::PricingOracle;
pub use settlement::SettlementService;
pub use simulator::MeterSimulator;

use rust_decimal::Decimal;

/// All energy and money quantities are rounded to 4 decimal places at rest
/// to keep repeated computations stable.
pub(crate) fn round4(value: Decimal) -> Decimal {
    value.round_dp(4)
}

/// Tolerance absorbing 4-decimal rounding in admission and balance checks.
pub(crate) fn epsilon() -> Decimal {
    Decimal::new(1, 9) // 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn round4_half_up() {
        assert_eq!(
            round4(Decimal::from_str("0.26399999").unwrap()),
            Decimal::from_str("0.2640").unwrap()
        );
        assert_eq!(
            round4(Decimal::from_str("1.00005").unwrap()),
            Decimal::from_str("1.0001").unwrap()
        );
    }

    #[test]
    fn epsilon_is_below_rounding_precision() {
        assert!(epsilon() < Decimal::new(1, 4));
    }
}
