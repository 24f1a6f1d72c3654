use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a marketplace participant.
///
/// Closed set; every operation boundary checks capabilities against the
/// variant rather than comparing raw strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    /// Virtual utility (DEI/HERON style); never holds stored offers
    Provider,
    /// Household that can sell
    Producer,
    /// Household that can only buy
    Consumer,
    /// Household that can both buy and sell
    Both,
}

impl AccountRole {
    /// Only producers and both-role households may create offers.
    pub fn can_sell(&self) -> bool {
        matches!(self, AccountRole::Producer | AccountRole::Both)
    }
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountRole::Provider => write!(f, "provider"),
            AccountRole::Producer => write!(f, "producer"),
            AccountRole::Consumer => write!(f, "consumer"),
            AccountRole::Both => write!(f, "both"),
        }
    }
}

impl std::str::FromStr for AccountRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "provider" => Ok(AccountRole::Provider),
            "producer" => Ok(AccountRole::Producer),
            "consumer" => Ok(AccountRole::Consumer),
            "both" => Ok(AccountRole::Both),
            _ => Err(format!("invalid account role: {}", s)),
        }
    }
}

// Stored as TEXT; decode goes through FromStr so an unknown value in the
// database surfaces as a column-decode error instead of a panic.
impl sqlx::Type<sqlx::Postgres> for AccountRole {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for AccountRole {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        raw.parse().map_err(Into::into)
    }
}

/// A marketplace participant with an EUR balance used for settlement.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub wallet: String,
    pub role: AccountRole,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selling_capability_per_role() {
        assert!(AccountRole::Producer.can_sell());
        assert!(AccountRole::Both.can_sell());
        assert!(!AccountRole::Consumer.can_sell());
        assert!(!AccountRole::Provider.can_sell());
    }

    #[test]
    fn role_round_trips_through_strings() {
        for role in [
            AccountRole::Provider,
            AccountRole::Producer,
            AccountRole::Consumer,
            AccountRole::Both,
        ] {
            assert_eq!(role.to_string().parse::<AccountRole>().unwrap(), role);
        }
        assert!("prosumer".parse::<AccountRole>().is_err());
    }
}
