use actix_web::{web, HttpResponse};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::infrastructure::models::{AddressRow, NewAddressRow};
use crate::schema::addresses;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAddressRequest {
    pub customer_id: Uuid,
    pub street: String,
    pub city: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub street: String,
    pub city: String,
    pub notes: Option<String>,
    pub created_at: String,
}

impl From<AddressRow> for AddressResponse {
    fn from(row: AddressRow) -> Self {
        AddressResponse {
            id: row.id,
            customer_id: row.customer_id,
            street: row.street,
            city: row.city,
            notes: row.notes,
            created_at: row.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListAddressesParams {
    pub customer_id: Option<Uuid>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /addresses
#[utoipa::path(
    post,
    path = "/addresses",
    request_body = CreateAddressRequest,
    responses(
        (status = 201, description = "Address created", body = AddressResponse),
        (status = 400, description = "Malformed input"),
    ),
    tag = "addresses"
)]
pub async fn create_address(
    state: web::Data<AppState>,
    body: web::Json<CreateAddressRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    if body.street.trim().is_empty() || body.city.trim().is_empty() {
        return Err(AppError::Validation("street and city must not be empty".into()));
    }

    let row = web::block(move || {
        let mut conn = state.pool.get().map_err(|e| AppError::Internal(e.to_string()))?;
        let row: AddressRow = diesel::insert_into(addresses::table)
            .values(&NewAddressRow {
                id: Uuid::new_v4(),
                customer_id: body.customer_id,
                street: body.street,
                city: body.city,
                notes: body.notes,
            })
            .returning(AddressRow::as_returning())
            .get_result(&mut conn)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok::<_, AppError>(row)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(AddressResponse::from(row)))
}

/// GET /addresses
#[utoipa::path(
    get,
    path = "/addresses",
    params(("customer_id" = Option<Uuid>, Query, description = "Filter by customer")),
    responses(
        (status = 200, description = "Addresses", body = [AddressResponse]),
    ),
    tag = "addresses"
)]
pub async fn list_addresses(
    state: web::Data<AppState>,
    query: web::Query<ListAddressesParams>,
) -> Result<HttpResponse, AppError> {
    let customer_id = query.into_inner().customer_id;
    let rows = web::block(move || {
        let mut conn = state.pool.get().map_err(|e| AppError::Internal(e.to_string()))?;
        let mut query = addresses::table.select(AddressRow::as_select()).into_boxed();
        if let Some(customer_id) = customer_id {
            query = query.filter(addresses::customer_id.eq(customer_id));
        }
        let rows: Vec<AddressRow> = query
            .order(addresses::created_at.desc())
            .load(&mut conn)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok::<_, AppError>(rows)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let addresses: Vec<AddressResponse> = rows.into_iter().map(AddressResponse::from).collect();
    Ok(HttpResponse::Ok().json(addresses))
}

/// GET /addresses/{id}
#[utoipa::path(
    get,
    path = "/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address UUID")),
    responses(
        (status = 200, description = "Address found", body = AddressResponse),
        (status = 404, description = "Address not found"),
    ),
    tag = "addresses"
)]
pub async fn get_address(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let address_id = path.into_inner();
    let row = web::block(move || {
        let mut conn = state.pool.get().map_err(|e| AppError::Internal(e.to_string()))?;
        addresses::table
            .find(address_id)
            .select(AddressRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| AppError::Internal(e.to_string()))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    match row {
        Some(row) => Ok(HttpResponse::Ok().json(AddressResponse::from(row))),
        None => Err(AppError::NotFound),
    }
}
