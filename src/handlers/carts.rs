use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::cart::{Cart, CartItem, CartItemPatch, CartStatus};
use crate::errors::AppError;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCartRequest {
    pub customer_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: CartStatus,
    pub coupon_code: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        CartResponse {
            id: cart.id,
            customer_id: cart.customer_id,
            status: cart.status,
            coupon_code: cart.coupon_code,
            created_at: cart.created_at.to_rfc3339(),
            updated_at: cart.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub unit_price: String,
}

impl From<CartItem> for CartItemResponse {
    fn from(item: CartItem) -> Self {
        CartItemResponse {
            id: item.id,
            cart_id: item.cart_id,
            product_id: item.product_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
            unit_price: item.unit_price.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyCouponRequest {
    pub code: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /carts
///
/// Opens an empty active cart for the customer. A customer can hold at most
/// one active cart; a second create conflicts.
#[utoipa::path(
    post,
    path = "/carts",
    request_body = CreateCartRequest,
    responses(
        (status = 201, description = "Cart created", body = CartResponse),
        (status = 409, description = "Customer already has an active cart"),
    ),
    tag = "carts"
)]
pub async fn create_cart(
    state: web::Data<AppState>,
    body: web::Json<CreateCartRequest>,
) -> Result<HttpResponse, AppError> {
    let customer_id = body.into_inner().customer_id;
    let cart = web::block(move || state.carts.create(customer_id).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Created().json(CartResponse::from(cart)))
}

/// GET /carts/{id}
#[utoipa::path(
    get,
    path = "/carts/{id}",
    params(("id" = Uuid, Path, description = "Cart UUID")),
    responses(
        (status = 200, description = "Cart found", body = CartResponse),
        (status = 404, description = "Cart not found"),
    ),
    tag = "carts"
)]
pub async fn get_cart(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let cart_id = path.into_inner();
    let cart = web::block(move || state.carts.get(cart_id).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// GET /carts/customer/{customer_id}/active
#[utoipa::path(
    get,
    path = "/carts/customer/{customer_id}/active",
    params(("customer_id" = Uuid, Path, description = "Customer UUID")),
    responses(
        (status = 200, description = "Active cart", body = CartResponse),
        (status = 404, description = "No active cart for this customer"),
    ),
    tag = "carts"
)]
pub async fn get_active_cart(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let customer_id = path.into_inner();
    let cart = web::block(move || state.carts.get_active(customer_id).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// POST /carts/{id}/abandon
#[utoipa::path(
    post,
    path = "/carts/{id}/abandon",
    params(("id" = Uuid, Path, description = "Cart UUID")),
    responses(
        (status = 200, description = "Cart abandoned", body = CartResponse),
        (status = 404, description = "Cart not found"),
        (status = 409, description = "Cart is not active"),
    ),
    tag = "carts"
)]
pub async fn abandon_cart(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let cart_id = path.into_inner();
    let cart = web::block(move || state.carts.abandon(cart_id).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// POST /carts/{id}/items
///
/// The unit price is resolved from the catalog at this moment and frozen on
/// the item.
#[utoipa::path(
    post,
    path = "/carts/{id}/items",
    params(("id" = Uuid, Path, description = "Cart UUID")),
    request_body = AddItemRequest,
    responses(
        (status = 201, description = "Item added", body = CartItemResponse),
        (status = 400, description = "Invalid quantity"),
        (status = 404, description = "Cart or product not found"),
        (status = 409, description = "Cart is not active"),
    ),
    tag = "carts"
)]
pub async fn add_item(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<AddItemRequest>,
) -> Result<HttpResponse, AppError> {
    let cart_id = path.into_inner();
    let body = body.into_inner();
    let item = web::block(move || {
        state
            .carts
            .add_item(cart_id, body.product_id, body.variant_id, body.quantity)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Created().json(CartItemResponse::from(item)))
}

/// GET /carts/{id}/items
#[utoipa::path(
    get,
    path = "/carts/{id}/items",
    params(("id" = Uuid, Path, description = "Cart UUID")),
    responses(
        (status = 200, description = "Items in the cart", body = [CartItemResponse]),
        (status = 404, description = "Cart not found"),
    ),
    tag = "carts"
)]
pub async fn list_items(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let cart_id = path.into_inner();
    let items = web::block(move || state.carts.items(cart_id).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    let items: Vec<CartItemResponse> = items.into_iter().map(CartItemResponse::from).collect();
    Ok(HttpResponse::Ok().json(items))
}

/// PUT /carts/items/{item_id}
#[utoipa::path(
    put,
    path = "/carts/items/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart item UUID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated", body = CartItemResponse),
        (status = 400, description = "Nothing to update or invalid quantity"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Cart is not active"),
    ),
    tag = "carts"
)]
pub async fn update_item(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateItemRequest>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let patch = CartItemPatch {
        quantity: body.into_inner().quantity,
    };
    let item = web::block(move || {
        state
            .carts
            .update_item(item_id, patch)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CartItemResponse::from(item)))
}

/// DELETE /carts/items/{item_id}
#[utoipa::path(
    delete,
    path = "/carts/items/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart item UUID")),
    responses(
        (status = 204, description = "Item removed"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Cart is not active"),
    ),
    tag = "carts"
)]
pub async fn remove_item(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    web::block(move || state.carts.remove_item(item_id).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /carts/{id}/coupon
///
/// Validates the code against the current clock and stores it on the cart.
/// Nothing is redeemed until the order is placed.
#[utoipa::path(
    post,
    path = "/carts/{id}/coupon",
    params(("id" = Uuid, Path, description = "Cart UUID")),
    request_body = ApplyCouponRequest,
    responses(
        (status = 200, description = "Coupon applied", body = CartResponse),
        (status = 404, description = "Cart or coupon not found"),
        (status = 409, description = "Cart is not active"),
        (status = 422, description = "Coupon is not usable right now"),
    ),
    tag = "carts"
)]
pub async fn apply_coupon(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ApplyCouponRequest>,
) -> Result<HttpResponse, AppError> {
    let cart_id = path.into_inner();
    let code = body.into_inner().code;
    let cart = web::block(move || {
        state
            .carts
            .apply_coupon(cart_id, &code, Utc::now())
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// DELETE /carts/{id}/coupon
#[utoipa::path(
    delete,
    path = "/carts/{id}/coupon",
    params(("id" = Uuid, Path, description = "Cart UUID")),
    responses(
        (status = 200, description = "Coupon cleared", body = CartResponse),
        (status = 404, description = "Cart not found"),
        (status = 409, description = "Cart is not active"),
    ),
    tag = "carts"
)]
pub async fn clear_coupon(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let cart_id = path.into_inner();
    let cart = web::block(move || state.carts.clear_coupon(cart_id).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}
