use actix_web::{web, HttpResponse};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::coupon::{Coupon, CouponPatch, NewCoupon};
use crate::errors::AppError;
use crate::state::AppState;

use super::parse_money;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCouponRequest {
    pub code: String,
    /// Percentage in [0, 100] as a decimal string, e.g. "10"
    pub percent_off: Option<String>,
    /// Fixed amount as a decimal string, e.g. "500"
    pub amount_off: Option<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    /// 0 (the default) means unlimited
    pub max_uses: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCouponRequest {
    pub percent_off: Option<String>,
    pub amount_off: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponResponse {
    pub code: String,
    pub percent_off: String,
    pub amount_off: String,
    pub valid_from: String,
    pub valid_until: String,
    pub max_uses: i32,
    pub use_count: i32,
    pub active: bool,
    pub created_at: String,
}

impl From<Coupon> for CouponResponse {
    fn from(coupon: Coupon) -> Self {
        CouponResponse {
            code: coupon.code,
            percent_off: coupon.percent_off.to_string(),
            amount_off: coupon.amount_off.to_string(),
            valid_from: coupon.valid_from.to_rfc3339(),
            valid_until: coupon.valid_until.to_rfc3339(),
            max_uses: coupon.max_uses,
            use_count: coupon.use_count,
            active: coupon.active,
            created_at: coupon.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateCouponResponse {
    pub valid: bool,
    pub percent_off: String,
    pub amount_off: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListCouponsParams {
    pub active: Option<bool>,
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
pub struct ListCouponsResponse {
    pub items: Vec<CouponResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /coupons
#[utoipa::path(
    post,
    path = "/coupons",
    request_body = CreateCouponRequest,
    responses(
        (status = 201, description = "Coupon created", body = CouponResponse),
        (status = 400, description = "Malformed terms"),
        (status = 409, description = "Code already exists"),
    ),
    tag = "coupons"
)]
pub async fn create_coupon(
    state: web::Data<AppState>,
    body: web::Json<CreateCouponRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let percent_off = match &body.percent_off {
        Some(raw) => parse_money("percent_off", raw)?,
        None => BigDecimal::zero(),
    };
    let amount_off = match &body.amount_off {
        Some(raw) => parse_money("amount_off", raw)?,
        None => BigDecimal::zero(),
    };
    let coupon = NewCoupon {
        code: body.code,
        percent_off,
        amount_off,
        valid_from: body.valid_from,
        valid_until: body.valid_until,
        max_uses: body.max_uses.unwrap_or(0),
        active: body.active.unwrap_or(true),
    };

    let created = web::block(move || state.coupons.create(coupon).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Created().json(CouponResponse::from(created)))
}

/// GET /coupons
#[utoipa::path(
    get,
    path = "/coupons",
    params(
        ("active" = Option<bool>, Query, description = "Filter by active flag"),
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of coupons", body = ListCouponsResponse),
    ),
    tag = "coupons"
)]
pub async fn list_coupons(
    state: web::Data<AppState>,
    query: web::Query<ListCouponsParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);
    let active = params.active;

    let result = web::block(move || {
        state
            .coupons
            .list(active, page, limit)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListCouponsResponse {
        items: result.items.into_iter().map(CouponResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// GET /coupons/{code}
#[utoipa::path(
    get,
    path = "/coupons/{code}",
    params(("code" = String, Path, description = "Coupon code (case-sensitive)")),
    responses(
        (status = 200, description = "Coupon found", body = CouponResponse),
        (status = 404, description = "Unknown code"),
    ),
    tag = "coupons"
)]
pub async fn get_coupon(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let code = path.into_inner();
    let coupon = web::block(move || state.coupons.get(&code).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CouponResponse::from(coupon)))
}

/// PUT /coupons/{code}
///
/// Partial update; the usage counter is not reachable from here.
#[utoipa::path(
    put,
    path = "/coupons/{code}",
    params(("code" = String, Path, description = "Coupon code (case-sensitive)")),
    request_body = UpdateCouponRequest,
    responses(
        (status = 200, description = "Coupon updated", body = CouponResponse),
        (status = 400, description = "Nothing to update or malformed terms"),
        (status = 404, description = "Unknown code"),
    ),
    tag = "coupons"
)]
pub async fn update_coupon(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateCouponRequest>,
) -> Result<HttpResponse, AppError> {
    let code = path.into_inner();
    let body = body.into_inner();
    let patch = CouponPatch {
        percent_off: body
            .percent_off
            .as_deref()
            .map(|raw| parse_money("percent_off", raw))
            .transpose()?,
        amount_off: body
            .amount_off
            .as_deref()
            .map(|raw| parse_money("amount_off", raw))
            .transpose()?,
        valid_from: body.valid_from,
        valid_until: body.valid_until,
        max_uses: body.max_uses,
        active: body.active,
    };

    let updated = web::block(move || state.coupons.update(&code, patch).map_err(AppError::from))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CouponResponse::from(updated)))
}

/// POST /coupons/{code}/validate
///
/// Read-only check against the current clock; never mutates the counter.
#[utoipa::path(
    post,
    path = "/coupons/{code}/validate",
    params(("code" = String, Path, description = "Coupon code (case-sensitive)")),
    responses(
        (status = 200, description = "Coupon is usable right now", body = ValidateCouponResponse),
        (status = 404, description = "Unknown code"),
        (status = 422, description = "Inactive, outside its window, or exhausted"),
    ),
    tag = "coupons"
)]
pub async fn validate_coupon(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let code = path.into_inner();
    let terms = web::block(move || {
        state
            .coupons
            .validate(&code, Utc::now())
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(ValidateCouponResponse {
        valid: true,
        percent_off: terms.percent_off.to_string(),
        amount_off: terms.amount_off.to_string(),
    }))
}
