//! Unified market view: virtual provider entries merged with stored
//! household offers into one render-ready list.

use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::models::{MarketItem, Offer};
use crate::services::offer_book::OfferBookService;
use crate::services::pricing::PricingOracle;

#[derive(Clone)]
pub struct MarketService {
    offer_book: OfferBookService,
    pricing: Arc<PricingOracle>,
    provider_names: Vec<String>,
}

impl MarketService {
    pub fn new(
        offer_book: OfferBookService,
        pricing: Arc<PricingOracle>,
        provider_names: Vec<String>,
    ) -> Self {
        Self {
            offer_book,
            pricing,
            provider_names,
        }
    }

    /// Read-only projection: one synthetic item per provider at the
    /// current oracle price, plus up to `household_limit` active offers,
    /// sorted ascending by unit price.
    pub async fn list_market(&self, household_limit: i64) -> Result<Vec<MarketItem>> {
        let now = Utc::now();
        let price = self.pricing.price_at(now);
        let multiplier = self.pricing.multiplier_at(now);

        let providers = self
            .provider_names
            .iter()
            .map(|name| MarketItem::provider(name, price, multiplier))
            .collect();

        let offers = self.offer_book.list_active_offers(household_limit).await?;
        Ok(merge_market(providers, &offers))
    }
}

/// Concatenate provider items with household offers and sort by price
/// ascending. The sort is stable, so items with equal prices keep their
/// original relative order (providers first, then offers in book order).
pub(crate) fn merge_market(providers: Vec<MarketItem>, offers: &[Offer]) -> Vec<MarketItem> {
    let mut items = providers;
    items.extend(offers.iter().map(MarketItem::household));
    items.sort_by(|a, b| a.price_per_kwh.cmp(&b.price_per_kwh));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarketItemKind, OfferStatus};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use uuid::Uuid;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn offer(price: &str, remaining: &str) -> Offer {
        Offer {
            id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            kwh_total: d(remaining),
            kwh_remaining: d(remaining),
            price_per_kwh: d(price),
            status: OfferStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn merged_view_is_sorted_by_price_ascending() {
        let providers = vec![MarketItem::provider("DEI", d("0.22"), d("1.0"))];
        let offers = vec![offer("0.30", "2"), offer("0.10", "5")];
        let items = merge_market(providers, &offers);

        let prices: Vec<_> = items.iter().map(|i| i.price_per_kwh).collect();
        assert_eq!(prices, vec![d("0.10"), d("0.22"), d("0.30")]);
    }

    #[test]
    fn equal_prices_keep_original_order() {
        // Provider and household at the same price: the provider was
        // concatenated first and must stay first.
        let providers = vec![MarketItem::provider("HERON", d("0.20"), d("1.0"))];
        let offers = vec![offer("0.20", "3")];
        let items = merge_market(providers, &offers);

        assert_eq!(items[0].kind, MarketItemKind::Provider);
        assert_eq!(items[1].kind, MarketItemKind::Household);
    }

    #[test]
    fn provider_items_carry_no_capacity() {
        let items = merge_market(vec![MarketItem::provider("DEI", d("0.22"), d("1.0"))], &[]);
        assert_eq!(items[0].kwh_remaining, None);
        assert_eq!(items[0].provider_name.as_deref(), Some("DEI"));
    }

    #[test]
    fn household_items_expose_offer_fields() {
        let o = offer("0.15", "4");
        let items = merge_market(Vec::new(), std::slice::from_ref(&o));
        assert_eq!(items[0].offer_id, Some(o.id));
        assert_eq!(items[0].seller_id, Some(o.seller_id));
        assert_eq!(items[0].kwh_remaining, Some(d("4")));
    }
}
