use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::payment::{NewPayment, Payment, PaymentStatus};
use crate::domain::ports::{AddressDirectory, AlertSink, OrderRepository, PaymentRepository};

use super::order_service::OrderService;
use super::payment_service::PaymentService;

/// Details for the optional payment attempt opened alongside a placement.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub gateway: String,
    pub method: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub payment: Option<Payment>,
}

/// Outcome of approving a payment. `order` is `None` when the payment was
/// approved but the order could not follow into `confirmed`; the
/// inconsistency has then already been raised as an operator alert.
#[derive(Debug, Clone)]
pub struct PaymentApproval {
    pub payment: Payment,
    pub order: Option<Order>,
}

/// The one component that sequences carts, orders and payments together.
/// There is no cross-entity transaction: each step commits on its own, and
/// partial failures are surfaced, never rolled back silently.
#[derive(Clone)]
pub struct CheckoutService<O, A, P, L> {
    orders: OrderService<O, A>,
    payments: PaymentService<P>,
    alerts: L,
}

impl<O, A, P, L> CheckoutService<O, A, P, L>
where
    O: OrderRepository,
    A: AddressDirectory,
    P: PaymentRepository,
    L: AlertSink,
{
    pub fn new(orders: OrderService<O, A>, payments: PaymentService<P>, alerts: L) -> Self {
        Self {
            orders,
            payments,
            alerts,
        }
    }

    /// Place an order from a cart and, when payment details are given, open
    /// a pending payment attempt over the order total. The payment step
    /// runs after the placement transaction has committed; if it fails the
    /// order stands without an attempt and the error is surfaced.
    pub fn place_order(
        &self,
        cart_id: Uuid,
        address_id: Uuid,
        shipping_fee: BigDecimal,
        payment: Option<PaymentIntent>,
        now: DateTime<Utc>,
    ) -> Result<PlacedOrder, DomainError> {
        let order = self.orders.place(cart_id, address_id, shipping_fee, now)?;

        let payment = match payment {
            Some(intent) => {
                let attempt = self
                    .payments
                    .create(NewPayment {
                        order_id: order.id,
                        gateway: intent.gateway,
                        method: intent.method,
                        amount: Some(order.total.clone()),
                        token: intent.token,
                    })
                    .map_err(|err| {
                        log::warn!(
                            "order {} placed but opening its payment attempt failed: {}",
                            order.id,
                            err
                        );
                        err
                    })?;
                Some(attempt)
            }
            None => None,
        };

        Ok(PlacedOrder { order, payment })
    }

    /// Approve a payment, then confirm its order, as two independent
    /// writes with the payment first. When the order refuses the
    /// transition the payment stays approved and the inconsistency is
    /// raised as an operator alert instead of being rolled back.
    pub fn approve_payment(&self, payment_id: Uuid) -> Result<PaymentApproval, DomainError> {
        let payment = self
            .payments
            .transition(payment_id, PaymentStatus::Approved)?;

        match self.orders.transition(payment.order_id, OrderStatus::Confirmed) {
            Ok(order) => Ok(PaymentApproval {
                payment,
                order: Some(order),
            }),
            Err(err) => {
                log::error!(
                    "payment {} approved but order {} was not confirmed: {}",
                    payment.id,
                    payment.order_id,
                    err
                );
                if let Err(alert_err) = self.alerts.raise(
                    "PaymentApprovedOrderUnconfirmed",
                    json!({
                        "payment_id": payment.id,
                        "order_id": payment.order_id,
                        "error": err.to_string(),
                    }),
                ) {
                    log::error!("recording the operator alert also failed: {alert_err}");
                }
                Ok(PaymentApproval {
                    payment,
                    order: None,
                })
            }
        }
    }

    /// An order counts as paid once at least one of its attempts is
    /// approved.
    pub fn is_paid(&self, order_id: Uuid) -> Result<bool, DomainError> {
        self.orders.get(order_id)?;
        let payments = self.payments.list_for_order(order_id)?;
        Ok(payments
            .iter()
            .any(|p| p.status == PaymentStatus::Approved))
    }
}
