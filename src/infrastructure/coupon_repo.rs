use diesel::prelude::*;
use diesel::PgConnection;

use crate::db::DbPool;
use crate::domain::coupon::{Coupon, CouponPatch, NewCoupon};
use crate::domain::errors::DomainError;
use crate::domain::order::Page;
use crate::domain::ports::CouponRepository;
use crate::schema::coupons;

use super::models::{CouponChanges, CouponRow, NewCouponRow};

#[derive(Clone)]
pub struct DieselCouponRepository {
    pool: DbPool,
}

impl DieselCouponRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// The compare-and-increment at the heart of the ledger: one conditional
/// UPDATE, so two checkouts racing on the same code can never push the
/// counter past the cap. Also used from the order placement transaction.
pub(crate) fn redeem_on(conn: &mut PgConnection, code: &str) -> Result<(), DomainError> {
    let updated = diesel::update(
        coupons::table.filter(
            coupons::code.eq(code).and(
                coupons::max_uses
                    .eq(0)
                    .or(coupons::use_count.lt(coupons::max_uses)),
            ),
        ),
    )
    .set(coupons::use_count.eq(coupons::use_count + 1))
    .execute(conn)?;

    if updated == 1 {
        return Ok(());
    }
    // Zero rows: either the code does not exist or the cap is reached.
    let exists: Option<String> = coupons::table
        .find(code)
        .select(coupons::code)
        .first(conn)
        .optional()?;
    match exists {
        Some(_) => Err(DomainError::CouponExhausted),
        None => Err(DomainError::NotFound),
    }
}

impl CouponRepository for DieselCouponRepository {
    fn create(&self, coupon: NewCoupon) -> Result<Coupon, DomainError> {
        let mut conn = self.pool.get()?;
        // Duplicate codes hit the primary key and surface as Conflict.
        let row: CouponRow = diesel::insert_into(coupons::table)
            .values(&NewCouponRow {
                code: coupon.code,
                percent_off: coupon.percent_off,
                amount_off: coupon.amount_off,
                valid_from: coupon.valid_from,
                valid_until: coupon.valid_until,
                max_uses: coupon.max_uses,
                active: coupon.active,
            })
            .returning(CouponRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn find(&self, code: &str) -> Result<Option<Coupon>, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(coupons::table
            .find(code)
            .select(CouponRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Coupon::from))
    }

    fn list(
        &self,
        active: Option<bool>,
        page: i64,
        limit: i64,
    ) -> Result<Page<Coupon>, DomainError> {
        let mut conn = self.pool.get()?;
        let offset = (page.max(1) - 1) * limit;

        let mut count_query = coupons::table
            .select(diesel::dsl::count_star())
            .into_boxed();
        let mut page_query = coupons::table.select(CouponRow::as_select()).into_boxed();
        if let Some(active) = active {
            count_query = count_query.filter(coupons::active.eq(active));
            page_query = page_query.filter(coupons::active.eq(active));
        }

        let total: i64 = count_query.first(&mut conn)?;
        let rows: Vec<CouponRow> = page_query
            .order(coupons::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load(&mut conn)?;

        Ok(Page {
            items: rows.into_iter().map(Coupon::from).collect(),
            total,
        })
    }

    fn update(&self, code: &str, patch: CouponPatch) -> Result<Coupon, DomainError> {
        let mut conn = self.pool.get()?;
        let row: Option<CouponRow> = diesel::update(coupons::table.find(code))
            .set(&CouponChanges {
                percent_off: patch.percent_off,
                amount_off: patch.amount_off,
                valid_from: patch.valid_from,
                valid_until: patch.valid_until,
                max_uses: patch.max_uses,
                active: patch.active,
            })
            .returning(CouponRow::as_returning())
            .get_result(&mut conn)
            .optional()?;
        row.map(Coupon::from).ok_or(DomainError::NotFound)
    }

    fn redeem(&self, code: &str) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        redeem_on(&mut conn, code)
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::{BigDecimal, Zero};
    use chrono::{Duration, Utc};

    use super::DieselCouponRepository;
    use crate::domain::coupon::{CouponPatch, NewCoupon};
    use crate::domain::errors::DomainError;
    use crate::domain::ports::CouponRepository;
    use crate::infrastructure::test_support::setup_db;

    fn capped(code: &str, max_uses: i32) -> NewCoupon {
        let now = Utc::now();
        NewCoupon {
            code: code.to_string(),
            percent_off: BigDecimal::from(10),
            amount_off: BigDecimal::zero(),
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            max_uses,
            active: true,
        }
    }

    #[tokio::test]
    async fn duplicate_code_conflicts() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCouponRepository::new(pool);

        repo.create(capped("WELCOME10", 0)).expect("create");
        let err = repo.create(capped("WELCOME10", 0)).expect_err("duplicate");
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn redeem_counts_up_to_the_cap() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCouponRepository::new(pool);

        repo.create(capped("LUNCH", 2)).expect("create");
        repo.redeem("LUNCH").expect("first use");
        repo.redeem("LUNCH").expect("second use");
        let err = repo.redeem("LUNCH").expect_err("over cap");
        assert!(matches!(err, DomainError::CouponExhausted));

        let coupon = repo.find("LUNCH").expect("find").expect("exists");
        assert_eq!(coupon.use_count, 2);
    }

    #[tokio::test]
    async fn redeem_unknown_code_is_not_found() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCouponRepository::new(pool);

        let err = repo.redeem("NOPE").expect_err("unknown");
        assert!(matches!(err, DomainError::NotFound));
    }

    /// N concurrent redemptions racing on a cap of N−1: exactly N−1 may
    /// win, no matter how the store interleaves them.
    #[tokio::test]
    async fn concurrent_redemptions_never_exceed_the_cap() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCouponRepository::new(pool.clone());

        const ATTEMPTS: usize = 8;
        repo.create(capped("RUSH", (ATTEMPTS - 1) as i32))
            .expect("create");

        let handles: Vec<_> = (0..ATTEMPTS)
            .map(|_| {
                let repo = DieselCouponRepository::new(pool.clone());
                std::thread::spawn(move || repo.redeem("RUSH"))
            })
            .collect();

        let mut won = 0;
        let mut exhausted = 0;
        for handle in handles {
            match handle.join().expect("thread panicked") {
                Ok(()) => won += 1,
                Err(DomainError::CouponExhausted) => exhausted += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(won, ATTEMPTS - 1);
        assert_eq!(exhausted, 1);
        let coupon = repo.find("RUSH").expect("find").expect("exists");
        assert_eq!(coupon.use_count, (ATTEMPTS - 1) as i32);
    }

    #[tokio::test]
    async fn update_patches_only_present_fields() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCouponRepository::new(pool);

        repo.create(capped("SPRING", 5)).expect("create");
        let updated = repo
            .update(
                "SPRING",
                CouponPatch {
                    active: Some(false),
                    ..CouponPatch::default()
                },
            )
            .expect("update");
        assert!(!updated.active);
        assert_eq!(updated.max_uses, 5, "untouched field survives");

        let err = repo
            .update("MISSING", CouponPatch {
                active: Some(true),
                ..CouponPatch::default()
            })
            .expect_err("unknown code");
        assert!(matches!(err, DomainError::NotFound));
    }
}
