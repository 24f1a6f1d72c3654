use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable record of a completed purchase, created exactly once per
/// successful settlement. The audit token is an opaque optional string
/// (e.g. an external transaction hash); it is stored, never verified.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Trade {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub buyer_id: Uuid,
    pub kwh: Decimal,
    pub total_price: Decimal,
    pub audit_token: Option<String>,
    pub executed_at: DateTime<Utc>,
}
