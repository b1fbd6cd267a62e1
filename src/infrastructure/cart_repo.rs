use chrono::Utc;
use diesel::prelude::*;
use diesel::PgConnection;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{Cart, CartItem, CartItemPatch, CartStatus, NewCartItem};
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::schema::{cart_items, carts};

use super::models::{CartItemChanges, CartItemRow, CartRow, NewCartItemRow, NewCartRow};

#[derive(Clone)]
pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Load a cart that is still open for mutation. Converted and abandoned
/// carts are immutable through this repository.
fn active_cart(conn: &mut PgConnection, cart_id: Uuid) -> Result<CartRow, DomainError> {
    let row: CartRow = carts::table
        .find(cart_id)
        .select(CartRow::as_select())
        .first(conn)
        .optional()?
        .ok_or(DomainError::NotFound)?;
    if row.status != CartStatus::Active.as_str() {
        return Err(DomainError::Conflict(format!(
            "cart is {}, not active",
            row.status
        )));
    }
    Ok(row)
}

/// Item writes count as cart activity.
fn touch(conn: &mut PgConnection, cart_id: Uuid) -> Result<(), DomainError> {
    diesel::update(carts::table.find(cart_id))
        .set(carts::updated_at.eq(Utc::now()))
        .execute(conn)?;
    Ok(())
}

impl CartRepository for DieselCartRepository {
    fn create(&self, customer_id: Uuid) -> Result<Cart, DomainError> {
        let mut conn = self.pool.get()?;
        // The partial unique index turns a concurrent duplicate into a
        // unique violation, which the error conversion maps to Conflict.
        let row: CartRow = diesel::insert_into(carts::table)
            .values(&NewCartRow {
                id: Uuid::new_v4(),
                customer_id,
                status: CartStatus::Active.as_str().to_string(),
            })
            .returning(CartRow::as_returning())
            .get_result(&mut conn)?;
        row.try_into()
    }

    fn find(&self, cart_id: Uuid) -> Result<Option<Cart>, DomainError> {
        let mut conn = self.pool.get()?;
        carts::table
            .find(cart_id)
            .select(CartRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Cart::try_from)
            .transpose()
    }

    fn find_active(&self, customer_id: Uuid) -> Result<Option<Cart>, DomainError> {
        let mut conn = self.pool.get()?;
        carts::table
            .filter(carts::customer_id.eq(customer_id))
            .filter(carts::status.eq(CartStatus::Active.as_str()))
            .select(CartRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Cart::try_from)
            .transpose()
    }

    fn items(&self, cart_id: Uuid) -> Result<Vec<CartItem>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows: Vec<CartItemRow> = cart_items::table
            .filter(cart_items::cart_id.eq(cart_id))
            .order(cart_items::created_at.asc())
            .select(CartItemRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    fn add_item(&self, cart_id: Uuid, item: NewCartItem) -> Result<CartItem, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            active_cart(conn, cart_id)?;
            let row: CartItemRow = diesel::insert_into(cart_items::table)
                .values(&NewCartItemRow {
                    id: Uuid::new_v4(),
                    cart_id,
                    product_id: item.product_id,
                    variant_id: item.variant_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .returning(CartItemRow::as_returning())
                .get_result(conn)?;
            touch(conn, cart_id)?;
            Ok(row.into())
        })
    }

    fn update_item(&self, item_id: Uuid, patch: CartItemPatch) -> Result<CartItem, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let item: CartItemRow = cart_items::table
                .find(item_id)
                .select(CartItemRow::as_select())
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound)?;
            active_cart(conn, item.cart_id)?;
            let row: CartItemRow = diesel::update(cart_items::table.find(item_id))
                .set(&CartItemChanges {
                    quantity: patch.quantity,
                })
                .returning(CartItemRow::as_returning())
                .get_result(conn)?;
            touch(conn, item.cart_id)?;
            Ok(row.into())
        })
    }

    fn remove_item(&self, item_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let item: CartItemRow = cart_items::table
                .find(item_id)
                .select(CartItemRow::as_select())
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound)?;
            active_cart(conn, item.cart_id)?;
            diesel::delete(cart_items::table.find(item_id)).execute(conn)?;
            // Removing the last item leaves the (empty) cart in place.
            touch(conn, item.cart_id)?;
            Ok(())
        })
    }

    fn set_coupon(&self, cart_id: Uuid, code: Option<&str>) -> Result<Cart, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            active_cart(conn, cart_id)?;
            let row: CartRow = diesel::update(carts::table.find(cart_id))
                .set((
                    carts::coupon_code.eq(code.map(str::to_string)),
                    carts::updated_at.eq(Utc::now()),
                ))
                .returning(CartRow::as_returning())
                .get_result(conn)?;
            row.try_into()
        })
    }

    fn abandon(&self, cart_id: Uuid) -> Result<Cart, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            active_cart(conn, cart_id)?;
            let row: CartRow = diesel::update(carts::table.find(cart_id))
                .set((
                    carts::status.eq(CartStatus::Abandoned.as_str()),
                    carts::updated_at.eq(Utc::now()),
                ))
                .returning(CartRow::as_returning())
                .get_result(conn)?;
            row.try_into()
        })
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    use super::DieselCartRepository;
    use crate::domain::cart::{CartItemPatch, CartStatus, NewCartItem};
    use crate::domain::errors::DomainError;
    use crate::domain::ports::CartRepository;
    use crate::infrastructure::test_support::setup_db;

    fn item(price: i32) -> NewCartItem {
        NewCartItem {
            product_id: Uuid::new_v4(),
            variant_id: None,
            quantity: 1,
            unit_price: BigDecimal::from(price),
        }
    }

    #[tokio::test]
    async fn second_active_cart_for_customer_conflicts() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool);
        let customer_id = Uuid::new_v4();

        repo.create(customer_id).expect("first cart");
        let err = repo.create(customer_id).expect_err("second cart must fail");
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn abandoning_frees_the_active_slot() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool);
        let customer_id = Uuid::new_v4();

        let cart = repo.create(customer_id).expect("create");
        let abandoned = repo.abandon(cart.id).expect("abandon");
        assert_eq!(abandoned.status, CartStatus::Abandoned);

        repo.create(customer_id).expect("fresh active cart");
        assert!(repo.abandon(cart.id).is_err(), "already abandoned");
    }

    #[tokio::test]
    async fn item_writes_touch_the_cart() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool);

        let cart = repo.create(Uuid::new_v4()).expect("create");
        let added = repo.add_item(cart.id, item(500)).expect("add");
        let after_add = repo.find(cart.id).expect("find").expect("cart");
        assert!(after_add.updated_at > cart.updated_at);

        repo.update_item(
            added.id,
            CartItemPatch {
                quantity: Some(3),
            },
        )
        .expect("update");
        let after_update = repo.find(cart.id).expect("find").expect("cart");
        assert!(after_update.updated_at > after_add.updated_at);

        repo.remove_item(added.id).expect("remove");
        assert!(repo.items(cart.id).expect("items").is_empty());
        let after_remove = repo.find(cart.id).expect("find").expect("cart");
        assert!(after_remove.updated_at > after_update.updated_at);
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool);

        let err = repo
            .update_item(
                Uuid::new_v4(),
                CartItemPatch {
                    quantity: Some(2),
                },
            )
            .expect_err("missing item");
        assert!(matches!(err, DomainError::NotFound));

        let err = repo.remove_item(Uuid::new_v4()).expect_err("missing item");
        assert!(matches!(err, DomainError::NotFound));
    }

    #[tokio::test]
    async fn coupon_can_be_set_and_cleared() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool);

        let cart = repo.create(Uuid::new_v4()).expect("create");
        let with_coupon = repo.set_coupon(cart.id, Some("WELCOME10")).expect("set");
        assert_eq!(with_coupon.coupon_code.as_deref(), Some("WELCOME10"));

        let cleared = repo.set_coupon(cart.id, None).expect("clear");
        assert!(cleared.coupon_code.is_none());
    }
}
