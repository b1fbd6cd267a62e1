use crate::application::cart_service::CartService;
use crate::application::checkout::CheckoutService;
use crate::application::coupon_service::CouponService;
use crate::application::order_service::OrderService;
use crate::application::payment_service::PaymentService;
use crate::application::shipment_service::ShipmentService;
use crate::db::DbPool;
use crate::infrastructure::cart_repo::DieselCartRepository;
use crate::infrastructure::catalog::{DieselAddressBook, DieselCatalog};
use crate::infrastructure::coupon_repo::DieselCouponRepository;
use crate::infrastructure::order_repo::DieselOrderRepository;
use crate::infrastructure::outbox::DieselOutbox;
use crate::infrastructure::payment_repo::DieselPaymentRepository;
use crate::infrastructure::shipment_repo::DieselShipmentRepository;

pub type Carts = CartService<DieselCartRepository, DieselCatalog, DieselCouponRepository>;
pub type Coupons = CouponService<DieselCouponRepository>;
pub type Orders = OrderService<DieselOrderRepository, DieselAddressBook>;
pub type Payments = PaymentService<DieselPaymentRepository>;
pub type Shipments = ShipmentService<DieselShipmentRepository>;
pub type Checkout =
    CheckoutService<DieselOrderRepository, DieselAddressBook, DieselPaymentRepository, DieselOutbox>;

/// Everything the handlers need, wired once at startup over a shared pool.
#[derive(Clone)]
pub struct AppState {
    pub carts: Carts,
    pub coupons: Coupons,
    pub orders: Orders,
    pub payments: Payments,
    pub shipments: Shipments,
    pub checkout: Checkout,
    /// Plain CRUD (catalog, addresses) talks to the pool directly.
    pub pool: DbPool,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        let carts = CartService::new(
            DieselCartRepository::new(pool.clone()),
            DieselCatalog::new(pool.clone()),
            DieselCouponRepository::new(pool.clone()),
        );
        let coupons = CouponService::new(DieselCouponRepository::new(pool.clone()));
        let orders = OrderService::new(
            DieselOrderRepository::new(pool.clone()),
            DieselAddressBook::new(pool.clone()),
        );
        let payments = PaymentService::new(DieselPaymentRepository::new(pool.clone()));
        let shipments = ShipmentService::new(DieselShipmentRepository::new(pool.clone()));
        let checkout = CheckoutService::new(
            orders.clone(),
            payments.clone(),
            DieselOutbox::new(pool.clone()),
        );

        Self {
            carts,
            coupons,
            orders,
            payments,
            shipments,
            checkout,
            pool,
        }
    }
}
