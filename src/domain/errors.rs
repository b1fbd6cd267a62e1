use thiserror::Error;

/// Closed set of failures a workflow operation can surface. Callers branch
/// on the variant, never on the message text.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("coupon is inactive")]
    CouponInactive,

    #[error("coupon is not valid yet")]
    CouponNotYetValid,

    #[error("coupon has expired")]
    CouponExpired,

    #[error("coupon usage limit reached")]
    CouponExhausted,

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        DomainError::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }
}
