use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;

/// States of one payment attempt: `pending → approved | rejected`, and an
/// approved payment may later be `refunded`. An order can hold several
/// attempts; uniqueness of approval is the checkout facade's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "approved" => Ok(PaymentStatus::Approved),
            "rejected" => Ok(PaymentStatus::Rejected),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(DomainError::Internal(format!(
                "unknown payment status '{other}'"
            ))),
        }
    }

    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Rejected) | (Approved, Refunded)
        )
    }
}

#[derive(Debug, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub gateway: String,
    pub method: String,
    pub amount: BigDecimal,
    pub status: PaymentStatus,
    pub token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: Uuid,
    pub gateway: String,
    pub method: String,
    /// Defaults to the order total when absent.
    pub amount: Option<BigDecimal>,
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::PaymentStatus::*;
    use super::*;

    #[test]
    fn pending_resolves_to_approved_or_rejected() {
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Refunded));
    }

    #[test]
    fn only_approved_payments_refund() {
        assert!(Approved.can_transition_to(Refunded));
        assert!(!Rejected.can_transition_to(Refunded));
    }

    #[test]
    fn no_reopening_settled_attempts() {
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Pending));
        assert!(!Refunded.can_transition_to(Pending));
        assert!(!Refunded.can_transition_to(Approved));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [Pending, Approved, Rejected, Refunded] {
            assert_eq!(PaymentStatus::parse(status.as_str()).unwrap(), status);
        }
    }
}
