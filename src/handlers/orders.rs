use actix_web::{web, HttpResponse};
use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::checkout::PaymentIntent;
use crate::domain::order::{Order, OrderFilter, OrderLine, OrderStatus};
use crate::errors::AppError;
use crate::state::AppState;

use super::parse_money;
use super::payments::PaymentResponse;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentIntentRequest {
    pub gateway: String,
    pub method: String,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub cart_id: Uuid,
    pub address_id: Uuid,
    /// Decimal shipping fee as a string, e.g. "1500". Defaults to 0.
    pub shipping_fee: Option<String>,
    /// When present, a pending payment attempt over the order total is
    /// opened right after placement.
    pub payment: Option<PaymentIntentRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: String,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(line: OrderLine) -> Self {
        OrderLineResponse {
            id: line.id,
            product_id: line.product_id,
            variant_id: line.variant_id,
            quantity: line.quantity,
            unit_price: line.unit_price.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub address_id: Uuid,
    pub status: OrderStatus,
    pub coupon_code: Option<String>,
    pub subtotal: String,
    pub discount: String,
    pub shipping_fee: String,
    pub total: String,
    pub lines: Vec<OrderLineResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        OrderResponse {
            id: order.id,
            customer_id: order.customer_id,
            address_id: order.address_id,
            status: order.status,
            coupon_code: order.coupon_code,
            subtotal: order.subtotal.to_string(),
            discount: order.discount.to_string(),
            shipping_fee: order.shipping_fee.to_string(),
            total: order.total.to_string(),
            lines: order.lines.into_iter().map(OrderLineResponse::from).collect(),
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlaceOrderResponse {
    pub order: OrderResponse,
    pub payment: Option<PaymentResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionOrderRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    pub customer_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderPaidResponse {
    pub order_id: Uuid,
    pub paid: bool,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Converts an active, non-empty cart into a pending order. Subtotal,
/// discount and total are fixed here; an applied coupon is re-validated and
/// redeemed inside the same transaction, so an exhausted code aborts the
/// placement and leaves the cart active.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = PlaceOrderResponse),
        (status = 400, description = "Empty cart or malformed input"),
        (status = 404, description = "Cart, address or coupon not found"),
        (status = 409, description = "Cart is not active"),
        (status = 422, description = "Coupon refused at placement time"),
    ),
    tag = "orders"
)]
pub async fn place_order(
    state: web::Data<AppState>,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let shipping_fee = match &body.shipping_fee {
        Some(raw) => parse_money("shipping_fee", raw)?,
        None => BigDecimal::zero(),
    };
    let payment = body.payment.map(|p| PaymentIntent {
        gateway: p.gateway,
        method: p.method,
        token: p.token,
    });

    let placed = web::block(move || {
        state
            .checkout
            .place_order(body.cart_id, body.address_id, shipping_fee, payment, Utc::now())
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(PlaceOrderResponse {
        order: OrderResponse::from(placed.order),
        payment: placed.payment.map(PaymentResponse::from),
    }))
}

/// GET /orders
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("customer_id" = Option<Uuid>, Query, description = "Filter by customer"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders (without lines)", body = ListOrdersResponse),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);
    let filter = OrderFilter {
        customer_id: params.customer_id,
        status: params.status,
    };

    let result = web::block(move || state.orders.list(filter, page, limit).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order with its lines", body = OrderResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let order = web::block(move || state.orders.get(order_id).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders/customer/{customer_id}/history
#[utoipa::path(
    get,
    path = "/orders/customer/{customer_id}/history",
    params(
        ("customer_id" = Uuid, Path, description = "Customer UUID"),
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "The customer's orders, newest first", body = ListOrdersResponse),
    ),
    tag = "orders"
)]
pub async fn order_history(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let customer_id = path.into_inner();
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let result = web::block(move || {
        state
            .orders
            .history(customer_id, page, limit)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// POST /orders/{id}/status
///
/// Only direct successors in the fulfillment graph are accepted; monetary
/// fields are never touched by a transition.
#[utoipa::path(
    post,
    path = "/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = TransitionOrderRequest,
    responses(
        (status = 200, description = "Order moved", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed from the current status"),
    ),
    tag = "orders"
)]
pub async fn transition_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<TransitionOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let target = body.into_inner().status;
    let order = web::block(move || {
        state
            .orders
            .transition(order_id, target)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/cancel
///
/// Soft-cancel: the record is retained with status `cancelled`. Refused
/// once the order has shipped.
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order already shipped, delivered or cancelled"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let order = web::block(move || state.orders.cancel(order_id).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders/{id}/payments
#[utoipa::path(
    get,
    path = "/orders/{id}/payments",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Payment attempts, oldest first", body = [PaymentResponse]),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn list_order_payments(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let payments = web::block(move || {
        state.orders.get(order_id).map_err(AppError::from)?;
        state
            .payments
            .list_for_order(order_id)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    let payments: Vec<PaymentResponse> = payments.into_iter().map(PaymentResponse::from).collect();
    Ok(HttpResponse::Ok().json(payments))
}

/// GET /orders/{id}/paid
///
/// An order is paid once at least one of its attempts is approved.
#[utoipa::path(
    get,
    path = "/orders/{id}/paid",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Whether the order is paid", body = OrderPaidResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn order_paid(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let paid = web::block(move || state.checkout.is_paid(order_id).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderPaidResponse { order_id, paid }))
}
