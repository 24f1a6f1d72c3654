use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a household sell offer.
///
/// `Closed` is the fully-filled terminal state reached when `kwh_remaining`
/// hits zero through settlement. `Cancelled` exists for explicit seller
/// withdrawal; both are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Active,
    Closed,
    Cancelled,
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OfferStatus::Active => write!(f, "active"),
            OfferStatus::Closed => write!(f, "closed"),
            OfferStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OfferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(OfferStatus::Active),
            "closed" => Ok(OfferStatus::Closed),
            "cancelled" => Ok(OfferStatus::Cancelled),
            _ => Err(format!("invalid offer status: {}", s)),
        }
    }
}

// Stored as TEXT; decode goes through FromStr so an unknown value in the
// database surfaces as a column-decode error instead of a panic.
impl sqlx::Type<sqlx::Postgres> for OfferStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OfferStatus {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        raw.parse().map_err(Into::into)
    }
}

/// A household sell offer. Owned exclusively by its seller; `kwh_remaining`
/// only ever decreases, and only through settlement.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Offer {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub kwh_total: Decimal,
    pub kwh_remaining: Decimal,
    pub price_per_kwh: Decimal,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            OfferStatus::Active,
            OfferStatus::Closed,
            OfferStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<OfferStatus>().unwrap(), status);
        }
        assert!("completed".parse::<OfferStatus>().is_err());
    }
}
