use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

/// HTTP-facing error. Each variant maps to a status code and a stable
/// machine-readable `code`; clients branch on the code, not the message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("Coupon is inactive")]
    CouponInactive,

    #[error("Coupon is not valid yet")]
    CouponNotYetValid,

    #[error("Coupon has expired")]
    CouponExpired,

    #[error("Coupon usage limit reached")]
    CouponExhausted,

    #[error("{0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::CouponInactive => "coupon_inactive",
            AppError::CouponNotYetValid => "coupon_not_yet_valid",
            AppError::CouponExpired => "coupon_expired",
            AppError::CouponExhausted => "coupon_exhausted",
            AppError::Validation(_) => "validation_error",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound => AppError::NotFound,
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            DomainError::InvalidTransition { from, to } => AppError::InvalidTransition { from, to },
            DomainError::CouponInactive => AppError::CouponInactive,
            DomainError::CouponNotYetValid => AppError::CouponNotYetValid,
            DomainError::CouponExpired => AppError::CouponExpired,
            DomainError::CouponExhausted => AppError::CouponExhausted,
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        match self {
            AppError::NotFound => HttpResponse::NotFound().json(body),
            AppError::Conflict(_) | AppError::InvalidTransition { .. } => {
                HttpResponse::Conflict().json(body)
            }
            AppError::CouponInactive
            | AppError::CouponNotYetValid
            | AppError::CouponExpired
            | AppError::CouponExhausted => HttpResponse::UnprocessableEntity().json(body),
            AppError::Validation(_) => HttpResponse::BadRequest().json(body),
            AppError::Internal(_) => HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Internal server error",
                "code": self.code(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::ResponseError;

    use super::*;

    #[test]
    fn not_found_returns_404() {
        assert_eq!(AppError::NotFound.error_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflicts_and_bad_transitions_return_409() {
        assert_eq!(
            AppError::Conflict("duplicate active cart".into())
                .error_response()
                .status(),
            StatusCode::CONFLICT
        );
        let err = AppError::InvalidTransition {
            from: "pending".into(),
            to: "shipped".into(),
        };
        assert_eq!(err.error_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn coupon_failures_return_422() {
        for err in [
            AppError::CouponInactive,
            AppError::CouponNotYetValid,
            AppError::CouponExpired,
            AppError::CouponExhausted,
        ] {
            assert_eq!(
                err.error_response().status(),
                StatusCode::UNPROCESSABLE_ENTITY
            );
        }
    }

    #[test]
    fn validation_returns_400_and_internal_500() {
        assert_eq!(
            AppError::Validation("quantity must be at least 1".into())
                .error_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal("boom".into()).error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn domain_errors_map_by_kind() {
        let err: AppError = DomainError::CouponExhausted.into();
        assert!(matches!(err, AppError::CouponExhausted));
        assert_eq!(err.code(), "coupon_exhausted");

        let err: AppError = DomainError::invalid_transition("pending", "shipped").into();
        assert_eq!(err.code(), "invalid_transition");

        let err: AppError = DomainError::NotFound.into();
        assert_eq!(err.code(), "not_found");
    }
}
