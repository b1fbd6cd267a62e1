use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;

/// `pending → en_route → delivered`, strictly linear. There is no
/// cancellation edge: a shipment that must stop is superseded by a new
/// shipment, or by the order's own cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    EnRoute,
    Delivered,
}

impl ShipmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::EnRoute => "en_route",
            ShipmentStatus::Delivered => "delivered",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "pending" => Ok(ShipmentStatus::Pending),
            "en_route" => Ok(ShipmentStatus::EnRoute),
            "delivered" => Ok(ShipmentStatus::Delivered),
            other => Err(DomainError::Internal(format!(
                "unknown shipment status '{other}'"
            ))),
        }
    }

    /// Only the immediate successor is reachable.
    pub fn can_transition_to(self, next: ShipmentStatus) -> bool {
        use ShipmentStatus::*;
        matches!((self, next), (Pending, EnRoute) | (EnRoute, Delivered))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentKind {
    Pickup,
    Delivery,
}

impl ShipmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ShipmentKind::Pickup => "pickup",
            ShipmentKind::Delivery => "delivery",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "pickup" => Ok(ShipmentKind::Pickup),
            "delivery" => Ok(ShipmentKind::Delivery),
            other => Err(DomainError::Internal(format!(
                "unknown shipment kind '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Shipment {
    pub id: Uuid,
    /// Recorded for the caller; this layer does not enforce the link.
    pub order_id: Uuid,
    pub kind: ShipmentKind,
    pub carrier: Option<String>,
    pub tracking_code: Option<String>,
    pub estimated_at: Option<DateTime<Utc>>,
    pub status: ShipmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewShipment {
    pub order_id: Uuid,
    pub kind: ShipmentKind,
    pub carrier: Option<String>,
    pub tracking_code: Option<String>,
    pub estimated_at: Option<DateTime<Utc>>,
}

/// Partial update of the descriptive fields; status only moves through
/// `update_status`.
#[derive(Debug, Clone, Default)]
pub struct ShipmentPatch {
    pub carrier: Option<String>,
    pub tracking_code: Option<String>,
    pub estimated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::ShipmentStatus::*;
    use super::*;

    #[test]
    fn only_forward_single_steps() {
        assert!(Pending.can_transition_to(EnRoute));
        assert!(EnRoute.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(Delivered));
    }

    #[test]
    fn no_backward_edges() {
        assert!(!EnRoute.can_transition_to(Pending));
        assert!(!Delivered.can_transition_to(EnRoute));
        assert!(!Delivered.can_transition_to(Pending));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [Pending, EnRoute, Delivered] {
            assert_eq!(ShipmentStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [ShipmentKind::Pickup, ShipmentKind::Delivery] {
            assert_eq!(ShipmentKind::parse(kind.as_str()).unwrap(), kind);
        }
    }
}
