use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::cart::{Cart, CartItem, CartItemPatch, NewCartItem};
use super::coupon::{Coupon, CouponPatch, NewCoupon};
use super::errors::DomainError;
use super::order::{Order, OrderFilter, OrderStatus, Page, PlaceOrder};
use super::payment::{NewPayment, Payment, PaymentStatus};
use super::shipment::{NewShipment, Shipment, ShipmentPatch, ShipmentStatus};

pub trait CartRepository: Send + Sync + 'static {
    /// Insert an empty active cart. `Conflict` if the customer already has
    /// an active one.
    fn create(&self, customer_id: Uuid) -> Result<Cart, DomainError>;
    fn find(&self, cart_id: Uuid) -> Result<Option<Cart>, DomainError>;
    fn find_active(&self, customer_id: Uuid) -> Result<Option<Cart>, DomainError>;
    fn items(&self, cart_id: Uuid) -> Result<Vec<CartItem>, DomainError>;
    /// All item writes require the parent cart to be active and touch its
    /// last-modified timestamp.
    fn add_item(&self, cart_id: Uuid, item: NewCartItem) -> Result<CartItem, DomainError>;
    fn update_item(&self, item_id: Uuid, patch: CartItemPatch) -> Result<CartItem, DomainError>;
    fn remove_item(&self, item_id: Uuid) -> Result<(), DomainError>;
    /// Store (or clear, with `None`) the applied coupon code. Validation is
    /// the caller's job; nothing is redeemed here.
    fn set_coupon(&self, cart_id: Uuid, code: Option<&str>) -> Result<Cart, DomainError>;
    fn abandon(&self, cart_id: Uuid) -> Result<Cart, DomainError>;
}

pub trait CouponRepository: Send + Sync + 'static {
    fn create(&self, coupon: NewCoupon) -> Result<Coupon, DomainError>;
    fn find(&self, code: &str) -> Result<Option<Coupon>, DomainError>;
    fn list(&self, active: Option<bool>, page: i64, limit: i64) -> Result<Page<Coupon>, DomainError>;
    fn update(&self, code: &str, patch: CouponPatch) -> Result<Coupon, DomainError>;
    /// Atomic conditional increment of the usage counter; increments only
    /// while the counter is under the cap (or the cap is 0).
    fn redeem(&self, code: &str) -> Result<(), DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// The all-or-nothing placement transaction: snapshot the cart's items,
    /// re-validate and redeem the coupon, insert the order, convert the
    /// cart. Any failure leaves no trace.
    fn place(&self, cmd: PlaceOrder) -> Result<Order, DomainError>;
    fn find(&self, order_id: Uuid) -> Result<Option<Order>, DomainError>;
    fn list(&self, filter: OrderFilter, page: i64, limit: i64) -> Result<Page<Order>, DomainError>;
    fn transition(&self, order_id: Uuid, target: OrderStatus) -> Result<Order, DomainError>;
}

pub trait PaymentRepository: Send + Sync + 'static {
    fn create(&self, payment: NewPayment) -> Result<Payment, DomainError>;
    fn find(&self, payment_id: Uuid) -> Result<Option<Payment>, DomainError>;
    fn list_for_order(&self, order_id: Uuid) -> Result<Vec<Payment>, DomainError>;
    fn transition(&self, payment_id: Uuid, target: PaymentStatus) -> Result<Payment, DomainError>;
}

pub trait ShipmentRepository: Send + Sync + 'static {
    fn create(&self, shipment: NewShipment) -> Result<Shipment, DomainError>;
    fn find(&self, shipment_id: Uuid) -> Result<Option<Shipment>, DomainError>;
    fn find_by_tracking(&self, tracking_code: &str) -> Result<Option<Shipment>, DomainError>;
    fn list(&self, status: Option<ShipmentStatus>, page: i64, limit: i64)
        -> Result<Page<Shipment>, DomainError>;
    fn update(&self, shipment_id: Uuid, patch: ShipmentPatch) -> Result<Shipment, DomainError>;
    fn transition(&self, shipment_id: Uuid, target: ShipmentStatus)
        -> Result<Shipment, DomainError>;
}

/// Read-only unit-price lookup against the catalog. Consulted once, when an
/// item enters a cart; the price is frozen on the item afterwards.
pub trait PriceCatalog: Send + Sync + 'static {
    fn unit_price(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<Option<BigDecimal>, DomainError>;
}

/// Existence check against the address book, consulted at order placement.
pub trait AddressDirectory: Send + Sync + 'static {
    fn exists(&self, address_id: Uuid) -> Result<bool, DomainError>;
}

/// Operator-visible alert channel for cross-entity inconsistencies the
/// facade cannot roll back.
pub trait AlertSink: Send + Sync + 'static {
    fn raise(&self, event_type: &str, payload: serde_json::Value) -> Result<(), DomainError>;
}
