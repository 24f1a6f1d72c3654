pub mod accounts;
pub mod health;
pub mod market;
pub mod offers;
pub mod readings;
pub mod trades;
