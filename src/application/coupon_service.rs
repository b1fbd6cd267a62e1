use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};

use crate::domain::coupon::{Coupon, CouponPatch, DiscountTerms, NewCoupon};
use crate::domain::errors::DomainError;
use crate::domain::order::Page;
use crate::domain::ports::CouponRepository;

/// Coupon administration and read-only validation. The redeeming side of
/// the ledger is only reachable from order placement.
#[derive(Clone)]
pub struct CouponService<R> {
    coupons: R,
}

impl<R: CouponRepository> CouponService<R> {
    pub fn new(coupons: R) -> Self {
        Self { coupons }
    }

    pub fn create(&self, coupon: NewCoupon) -> Result<Coupon, DomainError> {
        coupon.validate()?;
        self.coupons.create(coupon)
    }

    pub fn get(&self, code: &str) -> Result<Coupon, DomainError> {
        self.coupons.find(code)?.ok_or(DomainError::NotFound)
    }

    pub fn list(
        &self,
        active: Option<bool>,
        page: i64,
        limit: i64,
    ) -> Result<Page<Coupon>, DomainError> {
        self.coupons.list(active, page, limit)
    }

    pub fn update(&self, code: &str, patch: CouponPatch) -> Result<Coupon, DomainError> {
        if patch.percent_off.is_none()
            && patch.amount_off.is_none()
            && patch.valid_from.is_none()
            && patch.valid_until.is_none()
            && patch.max_uses.is_none()
            && patch.active.is_none()
        {
            return Err(DomainError::Validation("no fields to update".into()));
        }
        if let Some(percent) = &patch.percent_off {
            if *percent < BigDecimal::zero() || *percent > BigDecimal::from(100) {
                return Err(DomainError::Validation(
                    "percent_off must be between 0 and 100".into(),
                ));
            }
        }
        if let Some(amount) = &patch.amount_off {
            if *amount < BigDecimal::zero() {
                return Err(DomainError::Validation("amount_off must not be negative".into()));
            }
        }
        if let Some(max_uses) = patch.max_uses {
            if max_uses < 0 {
                return Err(DomainError::Validation("max_uses must not be negative".into()));
            }
        }
        self.coupons.update(code, patch)
    }

    /// Idempotent read-only check; surfaces the first failing rule so the
    /// caller can render a precise message.
    pub fn validate(&self, code: &str, now: DateTime<Utc>) -> Result<DiscountTerms, DomainError> {
        self.get(code)?.check(now)
    }
}
