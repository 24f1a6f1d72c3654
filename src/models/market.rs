use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Offer;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MarketItemKind {
    Provider,
    Household,
}

/// One row of the unified market view. Provider entries are virtual
/// (computed per request, capacity unlimited); household entries are
/// backed by stored offers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketItem {
    pub kind: MarketItemKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_multiplier: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_id: Option<Uuid>,
    /// `None` for providers, which are effectively unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kwh_remaining: Option<Decimal>,
    pub price_per_kwh: Decimal,
}

impl MarketItem {
    pub fn provider(name: &str, price: Decimal, multiplier: Decimal) -> Self {
        Self {
            kind: MarketItemKind::Provider,
            provider_name: Some(name.to_string()),
            current_multiplier: Some(multiplier),
            offer_id: None,
            seller_id: None,
            kwh_remaining: None,
            price_per_kwh: price,
        }
    }

    pub fn household(offer: &Offer) -> Self {
        Self {
            kind: MarketItemKind::Household,
            provider_name: None,
            current_multiplier: None,
            offer_id: Some(offer.id),
            seller_id: Some(offer.seller_id),
            kwh_remaining: Some(offer.kwh_remaining),
            price_per_kwh: offer.price_per_kwh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn provider_json_omits_household_only_fields() {
        let item = MarketItem::provider("DEI", d("0.22"), d("1.0"));
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["kind"], "provider");
        assert_eq!(value["provider_name"], "DEI");
        assert!(value.get("offer_id").is_none());
        assert!(value.get("seller_id").is_none());
        assert!(value.get("kwh_remaining").is_none());
    }

    #[test]
    fn household_json_omits_provider_only_fields() {
        let offer = Offer {
            id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            kwh_total: d("3"),
            kwh_remaining: d("3"),
            price_per_kwh: d("0.15"),
            status: crate::models::OfferStatus::Active,
            created_at: chrono::Utc::now(),
        };
        let value = serde_json::to_value(MarketItem::household(&offer)).unwrap();
        assert_eq!(value["kind"], "household");
        assert_eq!(value["offer_id"], offer.id.to_string());
        assert!(value.get("provider_name").is_none());
        assert!(value.get("current_multiplier").is_none());
    }
}
