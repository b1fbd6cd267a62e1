use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;

/// Lifecycle of a cart. A cart is mutable only while `Active`; conversion
/// happens exactly once, at order placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    Active,
    Abandoned,
    Converted,
}

impl CartStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Abandoned => "abandoned",
            CartStatus::Converted => "converted",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "active" => Ok(CartStatus::Active),
            "abandoned" => Ok(CartStatus::Abandoned),
            "converted" => Ok(CartStatus::Converted),
            other => Err(DomainError::Internal(format!(
                "unknown cart status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cart {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: CartStatus,
    pub coupon_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

/// Input for a new cart item. The unit price is resolved from the catalog
/// by the cart service and frozen here; it is never re-fetched later.
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

/// Field-by-field partial update for a cart item. Absent fields are left
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct CartItemPatch {
    pub quantity: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            CartStatus::Active,
            CartStatus::Abandoned,
            CartStatus::Converted,
        ] {
            assert_eq!(CartStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(CartStatus::parse("frozen").is_err());
    }
}
