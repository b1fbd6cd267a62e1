use actix_web::{web, HttpResponse};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::infrastructure::models::{
    NewProductRow, NewProductVariantRow, ProductRow, ProductVariantRow,
};
use crate::schema::{product_variants, products};
use crate::state::AppState;

use super::parse_money;

// Plain catalog CRUD; the workflows only ever read prices from here.

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    /// Decimal price as a string, e.g. "4500"
    pub base_price: String,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub base_price: String,
    pub active: bool,
    pub created_at: String,
}

impl From<ProductRow> for ProductResponse {
    fn from(row: ProductRow) -> Self {
        ProductResponse {
            id: row.id,
            name: row.name,
            description: row.description,
            base_price: row.base_price.to_string(),
            active: row.active,
            created_at: row.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVariantRequest {
    pub name: String,
    /// Decimal price as a string; overrides the product base price
    pub price: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VariantResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price: String,
    pub created_at: String,
}

impl From<ProductVariantRow> for VariantResponse {
    fn from(row: ProductVariantRow) -> Self {
        VariantResponse {
            id: row.id,
            product_id: row.product_id,
            name: row.name,
            price: row.price.to_string(),
            created_at: row.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListProductsParams {
    pub active: Option<bool>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /products
#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Malformed price"),
    ),
    tag = "catalog"
)]
pub async fn create_product(
    state: web::Data<AppState>,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }
    let base_price = parse_money("base_price", &body.base_price)?;

    let row = web::block(move || {
        let mut conn = state.pool.get().map_err(|e| AppError::Internal(e.to_string()))?;
        let row: ProductRow = diesel::insert_into(products::table)
            .values(&NewProductRow {
                id: Uuid::new_v4(),
                name: body.name,
                description: body.description,
                base_price,
                active: body.active.unwrap_or(true),
            })
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok::<_, AppError>(row)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(ProductResponse::from(row)))
}

/// GET /products
#[utoipa::path(
    get,
    path = "/products",
    params(("active" = Option<bool>, Query, description = "Filter by active flag")),
    responses(
        (status = 200, description = "All products", body = [ProductResponse]),
    ),
    tag = "catalog"
)]
pub async fn list_products(
    state: web::Data<AppState>,
    query: web::Query<ListProductsParams>,
) -> Result<HttpResponse, AppError> {
    let active = query.into_inner().active;
    let rows = web::block(move || {
        let mut conn = state.pool.get().map_err(|e| AppError::Internal(e.to_string()))?;
        let mut query = products::table.select(ProductRow::as_select()).into_boxed();
        if let Some(active) = active {
            query = query.filter(products::active.eq(active));
        }
        let rows: Vec<ProductRow> = query
            .order(products::created_at.desc())
            .load(&mut conn)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok::<_, AppError>(rows)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let products: Vec<ProductResponse> = rows.into_iter().map(ProductResponse::from).collect();
    Ok(HttpResponse::Ok().json(products))
}

/// GET /products/{id}
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "catalog"
)]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let row = web::block(move || {
        let mut conn = state.pool.get().map_err(|e| AppError::Internal(e.to_string()))?;
        products::table
            .find(product_id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| AppError::Internal(e.to_string()))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    match row {
        Some(row) => Ok(HttpResponse::Ok().json(ProductResponse::from(row))),
        None => Err(AppError::NotFound),
    }
}

/// POST /products/{id}/variants
#[utoipa::path(
    post,
    path = "/products/{id}/variants",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = CreateVariantRequest,
    responses(
        (status = 201, description = "Variant created", body = VariantResponse),
        (status = 400, description = "Malformed price"),
        (status = 404, description = "Product not found"),
    ),
    tag = "catalog"
)]
pub async fn create_variant(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<CreateVariantRequest>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let body = body.into_inner();
    let price = parse_money("price", &body.price)?;

    let row = web::block(move || {
        let mut conn = state.pool.get().map_err(|e| AppError::Internal(e.to_string()))?;
        let exists: Option<Uuid> = products::table
            .find(product_id)
            .select(products::id)
            .first(&mut conn)
            .optional()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        if exists.is_none() {
            return Err(AppError::NotFound);
        }
        let row: ProductVariantRow = diesel::insert_into(product_variants::table)
            .values(&NewProductVariantRow {
                id: Uuid::new_v4(),
                product_id,
                name: body.name,
                price,
            })
            .returning(ProductVariantRow::as_returning())
            .get_result(&mut conn)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok::<_, AppError>(row)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(VariantResponse::from(row)))
}

/// GET /products/{id}/variants
#[utoipa::path(
    get,
    path = "/products/{id}/variants",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Variants of the product", body = [VariantResponse]),
        (status = 404, description = "Product not found"),
    ),
    tag = "catalog"
)]
pub async fn list_variants(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let rows = web::block(move || {
        let mut conn = state.pool.get().map_err(|e| AppError::Internal(e.to_string()))?;
        let exists: Option<Uuid> = products::table
            .find(product_id)
            .select(products::id)
            .first(&mut conn)
            .optional()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        if exists.is_none() {
            return Err(AppError::NotFound);
        }
        let rows: Vec<ProductVariantRow> = product_variants::table
            .filter(product_variants::product_id.eq(product_id))
            .order(product_variants::created_at.asc())
            .select(ProductVariantRow::as_select())
            .load(&mut conn)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok::<_, AppError>(rows)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let variants: Vec<VariantResponse> = rows.into_iter().map(VariantResponse::from).collect();
    Ok(HttpResponse::Ok().json(variants))
}
