use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};

use super::errors::DomainError;

/// A discount code. Identity is the code itself, case-sensitive and
/// immutable once created.
#[derive(Debug, Clone)]
pub struct Coupon {
    pub code: String,
    pub percent_off: BigDecimal,
    pub amount_off: BigDecimal,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    /// 0 means unlimited.
    pub max_uses: i32,
    pub use_count: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Check whether the coupon can be used at `now`, without mutating
    /// anything. Checks run in a fixed order so the caller always sees the
    /// first failing rule.
    pub fn check(&self, now: DateTime<Utc>) -> Result<DiscountTerms, DomainError> {
        if !self.active {
            return Err(DomainError::CouponInactive);
        }
        if now < self.valid_from {
            return Err(DomainError::CouponNotYetValid);
        }
        if now > self.valid_until {
            return Err(DomainError::CouponExpired);
        }
        if self.max_uses > 0 && self.use_count >= self.max_uses {
            return Err(DomainError::CouponExhausted);
        }
        Ok(DiscountTerms {
            percent_off: self.percent_off.clone(),
            amount_off: self.amount_off.clone(),
        })
    }
}

/// The discount a validated coupon grants, detached from the coupon's
/// mutable usage bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountTerms {
    pub percent_off: BigDecimal,
    pub amount_off: BigDecimal,
}

impl DiscountTerms {
    /// `min(subtotal, subtotal * percent/100 + fixed)`; the discount can
    /// never push a total below zero on its own.
    pub fn discount_for(&self, subtotal: &BigDecimal) -> BigDecimal {
        let raw = subtotal * &self.percent_off / BigDecimal::from(100) + &self.amount_off;
        if raw > *subtotal {
            subtotal.clone()
        } else {
            raw
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub code: String,
    pub percent_off: BigDecimal,
    pub amount_off: BigDecimal,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub max_uses: i32,
    pub active: bool,
}

impl NewCoupon {
    /// Reject malformed terms before they reach the store. The code itself
    /// is only required to be non-empty; it is stored verbatim.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.code.trim().is_empty() {
            return Err(DomainError::Validation("coupon code must not be empty".into()));
        }
        if self.percent_off < BigDecimal::zero() || self.percent_off > BigDecimal::from(100) {
            return Err(DomainError::Validation(
                "percent_off must be between 0 and 100".into(),
            ));
        }
        if self.amount_off < BigDecimal::zero() {
            return Err(DomainError::Validation("amount_off must not be negative".into()));
        }
        if self.max_uses < 0 {
            return Err(DomainError::Validation("max_uses must not be negative".into()));
        }
        if self.valid_from > self.valid_until {
            return Err(DomainError::Validation(
                "valid_from must not be after valid_until".into(),
            ));
        }
        Ok(())
    }
}

/// Partial update for coupon administration. The usage counter is absent on
/// purpose: it only moves through redemption.
#[derive(Debug, Clone, Default)]
pub struct CouponPatch {
    pub percent_off: Option<BigDecimal>,
    pub amount_off: Option<BigDecimal>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn coupon(now: DateTime<Utc>) -> Coupon {
        Coupon {
            code: "WELCOME10".into(),
            percent_off: BigDecimal::from(10),
            amount_off: BigDecimal::zero(),
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            max_uses: 0,
            use_count: 0,
            active: true,
            created_at: now - Duration::days(2),
        }
    }

    #[test]
    fn valid_coupon_yields_terms() {
        let now = Utc::now();
        let terms = coupon(now).check(now).unwrap();
        assert_eq!(terms.percent_off, BigDecimal::from(10));
    }

    #[test]
    fn inactive_coupon_is_rejected() {
        let now = Utc::now();
        let mut c = coupon(now);
        c.active = false;
        assert!(matches!(c.check(now), Err(DomainError::CouponInactive)));
    }

    #[test]
    fn coupon_outside_window_is_rejected() {
        let now = Utc::now();
        let mut c = coupon(now);
        c.valid_from = now + Duration::hours(1);
        assert!(matches!(c.check(now), Err(DomainError::CouponNotYetValid)));

        let mut c = coupon(now);
        c.valid_until = now - Duration::hours(1);
        assert!(matches!(c.check(now), Err(DomainError::CouponExpired)));
    }

    #[test]
    fn exhausted_coupon_is_rejected() {
        let now = Utc::now();
        let mut c = coupon(now);
        c.max_uses = 3;
        c.use_count = 3;
        assert!(matches!(c.check(now), Err(DomainError::CouponExhausted)));
    }

    #[test]
    fn zero_cap_means_unlimited() {
        let now = Utc::now();
        let mut c = coupon(now);
        c.use_count = 10_000;
        assert!(c.check(now).is_ok());
    }

    #[test]
    fn percentage_discount() {
        let terms = DiscountTerms {
            percent_off: BigDecimal::from(10),
            amount_off: BigDecimal::zero(),
        };
        assert_eq!(
            terms.discount_for(&BigDecimal::from(10_000)),
            BigDecimal::from(1_000)
        );
    }

    #[test]
    fn combined_discount_adds_fixed_amount() {
        let terms = DiscountTerms {
            percent_off: BigDecimal::from(10),
            amount_off: BigDecimal::from(500),
        };
        assert_eq!(
            terms.discount_for(&BigDecimal::from(10_000)),
            BigDecimal::from(1_500)
        );
    }

    #[test]
    fn discount_is_clamped_to_subtotal() {
        let terms = DiscountTerms {
            percent_off: BigDecimal::from(100),
            amount_off: BigDecimal::from(500),
        };
        assert_eq!(
            terms.discount_for(&BigDecimal::from(1_000)),
            BigDecimal::from(1_000)
        );
    }

    #[test]
    fn new_coupon_bounds_are_enforced() {
        let now = Utc::now();
        let good = NewCoupon {
            code: "SUMMER".into(),
            percent_off: BigDecimal::from(15),
            amount_off: BigDecimal::zero(),
            valid_from: now,
            valid_until: now + Duration::days(30),
            max_uses: 100,
            active: true,
        };
        assert!(good.validate().is_ok());

        let mut bad = good.clone();
        bad.percent_off = BigDecimal::from(101);
        assert!(bad.validate().is_err());

        let mut bad = good.clone();
        bad.valid_from = now + Duration::days(31);
        assert!(bad.validate().is_err());

        let mut bad = good;
        bad.code = "  ".into();
        assert!(bad.validate().is_err());
    }
}
