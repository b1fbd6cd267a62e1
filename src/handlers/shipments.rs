use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::shipment::{
    NewShipment, Shipment, ShipmentKind, ShipmentPatch, ShipmentStatus,
};
use crate::errors::AppError;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateShipmentRequest {
    pub order_id: Uuid,
    pub kind: ShipmentKind,
    pub carrier: Option<String>,
    pub tracking_code: Option<String>,
    pub estimated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateShipmentRequest {
    pub carrier: Option<String>,
    pub tracking_code: Option<String>,
    pub estimated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateShipmentStatusRequest {
    pub status: ShipmentStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShipmentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub kind: ShipmentKind,
    pub carrier: Option<String>,
    pub tracking_code: Option<String>,
    pub estimated_at: Option<String>,
    pub status: ShipmentStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Shipment> for ShipmentResponse {
    fn from(shipment: Shipment) -> Self {
        ShipmentResponse {
            id: shipment.id,
            order_id: shipment.order_id,
            kind: shipment.kind,
            carrier: shipment.carrier,
            tracking_code: shipment.tracking_code,
            estimated_at: shipment.estimated_at.map(|t| t.to_rfc3339()),
            status: shipment.status,
            created_at: shipment.created_at.to_rfc3339(),
            updated_at: shipment.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListShipmentsParams {
    pub status: Option<ShipmentStatus>,
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
pub struct ListShipmentsResponse {
    pub items: Vec<ShipmentResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /shipments
///
/// The shipment records its order id but this layer does not enforce the
/// link; a superseded shipment is replaced by creating a new one.
#[utoipa::path(
    post,
    path = "/shipments",
    request_body = CreateShipmentRequest,
    responses(
        (status = 201, description = "Shipment created", body = ShipmentResponse),
    ),
    tag = "shipments"
)]
pub async fn create_shipment(
    state: web::Data<AppState>,
    body: web::Json<CreateShipmentRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let shipment = NewShipment {
        order_id: body.order_id,
        kind: body.kind,
        carrier: body.carrier,
        tracking_code: body.tracking_code,
        estimated_at: body.estimated_at,
    };
    let created = web::block(move || state.shipments.create(shipment).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Created().json(ShipmentResponse::from(created)))
}

/// GET /shipments
#[utoipa::path(
    get,
    path = "/shipments",
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of shipments", body = ListShipmentsResponse),
    ),
    tag = "shipments"
)]
pub async fn list_shipments(
    state: web::Data<AppState>,
    query: web::Query<ListShipmentsParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);
    let status = params.status;

    let result = web::block(move || {
        state
            .shipments
            .list(status, page, limit)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListShipmentsResponse {
        items: result
            .items
            .into_iter()
            .map(ShipmentResponse::from)
            .collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// GET /shipments/{id}
#[utoipa::path(
    get,
    path = "/shipments/{id}",
    params(("id" = Uuid, Path, description = "Shipment UUID")),
    responses(
        (status = 200, description = "Shipment found", body = ShipmentResponse),
        (status = 404, description = "Shipment not found"),
    ),
    tag = "shipments"
)]
pub async fn get_shipment(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let shipment_id = path.into_inner();
    let shipment = web::block(move || state.shipments.get(shipment_id).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(ShipmentResponse::from(shipment)))
}

/// GET /shipments/tracking/{code}
#[utoipa::path(
    get,
    path = "/shipments/tracking/{code}",
    params(("code" = String, Path, description = "Carrier tracking code")),
    responses(
        (status = 200, description = "Shipment found", body = ShipmentResponse),
        (status = 404, description = "No shipment with this tracking code"),
    ),
    tag = "shipments"
)]
pub async fn get_shipment_by_tracking(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let code = path.into_inner();
    let shipment = web::block(move || {
        state
            .shipments
            .find_by_tracking(&code)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(ShipmentResponse::from(shipment)))
}

/// PUT /shipments/{id}
///
/// Partial update of carrier, tracking code and estimated arrival; the
/// status is only reachable through the status endpoint.
#[utoipa::path(
    put,
    path = "/shipments/{id}",
    params(("id" = Uuid, Path, description = "Shipment UUID")),
    request_body = UpdateShipmentRequest,
    responses(
        (status = 200, description = "Shipment updated", body = ShipmentResponse),
        (status = 400, description = "Nothing to update"),
        (status = 404, description = "Shipment not found"),
    ),
    tag = "shipments"
)]
pub async fn update_shipment(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateShipmentRequest>,
) -> Result<HttpResponse, AppError> {
    let shipment_id = path.into_inner();
    let body = body.into_inner();
    let patch = ShipmentPatch {
        carrier: body.carrier,
        tracking_code: body.tracking_code,
        estimated_at: body.estimated_at,
    };
    let updated = web::block(move || {
        state
            .shipments
            .update(shipment_id, patch)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(ShipmentResponse::from(updated)))
}

/// POST /shipments/{id}/status
///
/// `pending → en_route → delivered`, one step at a time, no way back.
#[utoipa::path(
    post,
    path = "/shipments/{id}/status",
    params(("id" = Uuid, Path, description = "Shipment UUID")),
    request_body = UpdateShipmentStatusRequest,
    responses(
        (status = 200, description = "Shipment moved", body = ShipmentResponse),
        (status = 404, description = "Shipment not found"),
        (status = 409, description = "Target is not the immediate successor"),
    ),
    tag = "shipments"
)]
pub async fn update_shipment_status(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateShipmentStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let shipment_id = path.into_inner();
    let target = body.into_inner().status;
    let shipment = web::block(move || {
        state
            .shipments
            .update_status(shipment_id, target)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(ShipmentResponse::from(shipment)))
}
