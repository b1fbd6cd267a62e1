use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderFilter, OrderStatus, Page, PlaceOrder};
use crate::domain::ports::{AddressDirectory, OrderRepository};

/// Drives orders from placement through the fulfillment state machine.
/// Monetary fields are computed once, inside the placement transaction, and
/// never touched again.
#[derive(Clone)]
pub struct OrderService<R, A> {
    orders: R,
    addresses: A,
}

impl<R, A> OrderService<R, A>
where
    R: OrderRepository,
    A: AddressDirectory,
{
    pub fn new(orders: R, addresses: A) -> Self {
        Self { orders, addresses }
    }

    /// Convert an active, non-empty cart into a pending order. The applied
    /// coupon (if any) is re-validated against `now` and redeemed inside
    /// the same transaction; a failed redemption aborts the placement and
    /// leaves the cart active.
    pub fn place(
        &self,
        cart_id: Uuid,
        address_id: Uuid,
        shipping_fee: BigDecimal,
        now: DateTime<Utc>,
    ) -> Result<Order, DomainError> {
        if shipping_fee < BigDecimal::zero() {
            return Err(DomainError::Validation(
                "shipping_fee must not be negative".into(),
            ));
        }
        if !self.addresses.exists(address_id)? {
            return Err(DomainError::NotFound);
        }
        self.orders.place(PlaceOrder {
            cart_id,
            address_id,
            shipping_fee,
            now,
        })
    }

    pub fn get(&self, order_id: Uuid) -> Result<Order, DomainError> {
        self.orders.find(order_id)?.ok_or(DomainError::NotFound)
    }

    pub fn list(
        &self,
        filter: OrderFilter,
        page: i64,
        limit: i64,
    ) -> Result<Page<Order>, DomainError> {
        self.orders.list(filter, page, limit)
    }

    /// A customer's past orders, newest first.
    pub fn history(
        &self,
        customer_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<Page<Order>, DomainError> {
        self.orders.list(
            OrderFilter {
                customer_id: Some(customer_id),
                status: None,
            },
            page,
            limit,
        )
    }

    /// The only way order status changes. Rejects every edge that is not a
    /// direct successor in the fulfillment graph.
    pub fn transition(&self, order_id: Uuid, target: OrderStatus) -> Result<Order, DomainError> {
        self.orders.transition(order_id, target)
    }

    /// Soft-cancel: the record is kept with status `cancelled`. Permitted
    /// from `pending`, `confirmed` and `preparing` only.
    pub fn cancel(&self, order_id: Uuid) -> Result<Order, DomainError> {
        self.orders.transition(order_id, OrderStatus::Cancelled)
    }
}
