pub mod account;
pub mod market;
pub mod meter;
pub mod offer;
pub mod trade;

pub use account::{Account, AccountRole};
pub use market::{MarketItem, MarketItemKind};
pub use meter::{MeterReading, MeterSeriesPoint};
pub use offer::{Offer, OfferStatus};
pub use trade::Trade;
