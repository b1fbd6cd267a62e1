use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::payment::{NewPayment, Payment, PaymentStatus};
use crate::errors::AppError;
use crate::state::AppState;

use super::orders::OrderResponse;
use super::parse_money;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
    /// e.g. "webpay", "mercadopago"
    pub gateway: String,
    /// e.g. "credit_card", "debit_card", "transfer"
    pub method: String,
    /// Decimal amount as a string. Defaults to the order total.
    pub amount: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub gateway: String,
    pub method: String,
    pub amount: String,
    pub status: PaymentStatus,
    pub token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        PaymentResponse {
            id: payment.id,
            order_id: payment.order_id,
            gateway: payment.gateway,
            method: payment.method,
            amount: payment.amount.to_string(),
            status: payment.status,
            token: payment.token,
            created_at: payment.created_at.to_rfc3339(),
            updated_at: payment.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApprovePaymentResponse {
    pub payment: PaymentResponse,
    /// Absent when the payment was approved but the order refused to
    /// confirm; an operator alert has been recorded in that case.
    pub order: Option<OrderResponse>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /payments
///
/// Opens a pending payment attempt against an order. Rejected attempts can
/// be followed by new ones.
#[utoipa::path(
    post,
    path = "/payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment attempt opened", body = PaymentResponse),
        (status = 400, description = "Malformed input"),
        (status = 404, description = "Order not found"),
    ),
    tag = "payments"
)]
pub async fn create_payment(
    state: web::Data<AppState>,
    body: web::Json<CreatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let amount = body
        .amount
        .as_deref()
        .map(|raw| parse_money("amount", raw))
        .transpose()?;
    let payment = NewPayment {
        order_id: body.order_id,
        gateway: body.gateway,
        method: body.method,
        amount,
        token: body.token,
    };

    let created = web::block(move || state.payments.create(payment).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Created().json(PaymentResponse::from(created)))
}

/// GET /payments/{id}
#[utoipa::path(
    get,
    path = "/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment UUID")),
    responses(
        (status = 200, description = "Payment found", body = PaymentResponse),
        (status = 404, description = "Payment not found"),
    ),
    tag = "payments"
)]
pub async fn get_payment(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let payment_id = path.into_inner();
    let payment = web::block(move || state.payments.get(payment_id).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(PaymentResponse::from(payment)))
}

/// POST /payments/{id}/approve
///
/// Approves the payment, then confirms its order, in that fixed sequence.
/// When the order refuses the transition the payment stays approved, the
/// inconsistency is recorded as an operator alert, and the response carries
/// no order.
#[utoipa::path(
    post,
    path = "/payments/{id}/approve",
    params(("id" = Uuid, Path, description = "Payment UUID")),
    responses(
        (status = 200, description = "Payment approved", body = ApprovePaymentResponse),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Payment is not pending"),
    ),
    tag = "payments"
)]
pub async fn approve_payment(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let payment_id = path.into_inner();
    let approval = web::block(move || {
        state
            .checkout
            .approve_payment(payment_id)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(ApprovePaymentResponse {
        payment: PaymentResponse::from(approval.payment),
        order: approval.order.map(OrderResponse::from),
    }))
}

/// POST /payments/{id}/reject
#[utoipa::path(
    post,
    path = "/payments/{id}/reject",
    params(("id" = Uuid, Path, description = "Payment UUID")),
    responses(
        (status = 200, description = "Payment rejected", body = PaymentResponse),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Payment is not pending"),
    ),
    tag = "payments"
)]
pub async fn reject_payment(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let payment_id = path.into_inner();
    let payment = web::block(move || {
        state
            .payments
            .transition(payment_id, PaymentStatus::Rejected)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(PaymentResponse::from(payment)))
}

/// POST /payments/{id}/refund
#[utoipa::path(
    post,
    path = "/payments/{id}/refund",
    params(("id" = Uuid, Path, description = "Payment UUID")),
    responses(
        (status = 200, description = "Payment refunded", body = PaymentResponse),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Only approved payments can be refunded"),
    ),
    tag = "payments"
)]
pub async fn refund_payment(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let payment_id = path.into_inner();
    let payment = web::block(move || {
        state
            .payments
            .transition(payment_id, PaymentStatus::Refunded)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(PaymentResponse::from(payment)))
}
