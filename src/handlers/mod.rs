pub mod addresses;
pub mod carts;
pub mod coupons;
pub mod orders;
pub mod payments;
pub mod products;
pub mod shipments;

use std::str::FromStr;

use bigdecimal::BigDecimal;
use utoipa::OpenApi;

use crate::errors::AppError;

/// Decimal request fields travel as strings (e.g. "9.99") to avoid
/// floating-point loss.
pub(crate) fn parse_money(field: &str, value: &str) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(value)
        .map_err(|e| AppError::Validation(format!("invalid {field} '{value}': {e}")))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        carts::create_cart,
        carts::get_cart,
        carts::get_active_cart,
        carts::abandon_cart,
        carts::add_item,
        carts::list_items,
        carts::update_item,
        carts::remove_item,
        carts::apply_coupon,
        carts::clear_coupon,
        coupons::create_coupon,
        coupons::list_coupons,
        coupons::get_coupon,
        coupons::update_coupon,
        coupons::validate_coupon,
        orders::place_order,
        orders::list_orders,
        orders::get_order,
        orders::order_history,
        orders::transition_order,
        orders::cancel_order,
        orders::list_order_payments,
        orders::order_paid,
        payments::create_payment,
        payments::get_payment,
        payments::approve_payment,
        payments::reject_payment,
        payments::refund_payment,
        shipments::create_shipment,
        shipments::list_shipments,
        shipments::get_shipment,
        shipments::get_shipment_by_tracking,
        shipments::update_shipment,
        shipments::update_shipment_status,
        products::create_product,
        products::list_products,
        products::get_product,
        products::create_variant,
        products::list_variants,
        addresses::create_address,
        addresses::list_addresses,
        addresses::get_address,
    ),
    components(schemas(
        carts::CreateCartRequest,
        carts::CartResponse,
        carts::CartItemResponse,
        carts::AddItemRequest,
        carts::UpdateItemRequest,
        carts::ApplyCouponRequest,
        coupons::CreateCouponRequest,
        coupons::UpdateCouponRequest,
        coupons::CouponResponse,
        coupons::ValidateCouponResponse,
        coupons::ListCouponsResponse,
        orders::PlaceOrderRequest,
        orders::PaymentIntentRequest,
        orders::PlaceOrderResponse,
        orders::OrderResponse,
        orders::OrderLineResponse,
        orders::TransitionOrderRequest,
        orders::ListOrdersResponse,
        orders::OrderPaidResponse,
        payments::CreatePaymentRequest,
        payments::PaymentResponse,
        payments::ApprovePaymentResponse,
        shipments::CreateShipmentRequest,
        shipments::UpdateShipmentRequest,
        shipments::UpdateShipmentStatusRequest,
        shipments::ShipmentResponse,
        shipments::ListShipmentsResponse,
        products::CreateProductRequest,
        products::ProductResponse,
        products::CreateVariantRequest,
        products::VariantResponse,
        addresses::CreateAddressRequest,
        addresses::AddressResponse,
        crate::domain::cart::CartStatus,
        crate::domain::order::OrderStatus,
        crate::domain::payment::PaymentStatus,
        crate::domain::shipment::ShipmentStatus,
        crate::domain::shipment::ShipmentKind,
    ))
)]
pub struct ApiDoc;
