use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use diesel::prelude::*;
use diesel::PgConnection;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::CartStatus;
use crate::domain::coupon::Coupon;
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderFilter, OrderStatus, Page, PlaceOrder};
use crate::domain::ports::OrderRepository;
use crate::schema::{cart_items, carts, coupons, order_items, orders};

use super::coupon_repo::redeem_on;
use super::models::{
    order_from_rows, CartItemRow, CartRow, CouponRow, NewOrderItemRow, NewOrderRow, OrderItemRow,
    OrderRow,
};
use super::outbox;

#[derive(Clone)]
pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn load_items(conn: &mut PgConnection, order_id: Uuid) -> Result<Vec<OrderItemRow>, DomainError> {
    Ok(order_items::table
        .filter(order_items::order_id.eq(order_id))
        .order(order_items::created_at.asc())
        .select(OrderItemRow::as_select())
        .load(conn)?)
}

impl OrderRepository for DieselOrderRepository {
    /// The all-or-nothing placement. Coupon redemption, order and line
    /// inserts, cart conversion and the outbox event share one transaction,
    /// so a failure at any step (a coupon exhausted by a concurrent
    /// checkout, most notably) leaves the cart active and no order behind.
    fn place(&self, cmd: PlaceOrder) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. The cart, which must still be active.
            let cart: CartRow = carts::table
                .find(cmd.cart_id)
                .select(CartRow::as_select())
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound)?;
            if cart.status != CartStatus::Active.as_str() {
                return Err(DomainError::Conflict(format!(
                    "cart is {}, not active",
                    cart.status
                )));
            }

            // 2. Snapshot the items; the order copies them, it does not
            //    reference them.
            let items: Vec<CartItemRow> = cart_items::table
                .filter(cart_items::cart_id.eq(cmd.cart_id))
                .order(cart_items::created_at.asc())
                .select(CartItemRow::as_select())
                .load(conn)?;
            if items.is_empty() {
                return Err(DomainError::Validation("cart has no items".into()));
            }

            let subtotal = items.iter().fold(BigDecimal::zero(), |acc, item| {
                acc + BigDecimal::from(item.quantity) * &item.unit_price
            });

            // 3. The coupon is re-validated against the placement clock
            //    (the cart-apply validation is stale by now) and then
            //    redeemed with the conditional increment.
            let mut discount = BigDecimal::zero();
            if let Some(code) = &cart.coupon_code {
                let coupon: CouponRow = coupons::table
                    .find(code)
                    .select(CouponRow::as_select())
                    .first(conn)
                    .optional()?
                    .ok_or(DomainError::NotFound)?;
                let terms = Coupon::from(coupon).check(cmd.now)?;
                discount = terms.discount_for(&subtotal);
                redeem_on(conn, code)?;
            }

            let total = &subtotal - &discount + &cmd.shipping_fee;

            // 4. The order and its copied lines.
            let order_id = Uuid::new_v4();
            let order_row: OrderRow = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    customer_id: cart.customer_id,
                    address_id: cmd.address_id,
                    status: OrderStatus::Pending.as_str().to_string(),
                    coupon_code: cart.coupon_code.clone(),
                    subtotal: subtotal.clone(),
                    discount: discount.clone(),
                    shipping_fee: cmd.shipping_fee.clone(),
                    total: total.clone(),
                })
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            let new_lines: Vec<NewOrderItemRow> = items
                .iter()
                .map(|item| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: item.product_id,
                    variant_id: item.variant_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price.clone(),
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&new_lines)
                .execute(conn)?;

            // 5. The cart converts exactly once and is immutable afterwards.
            diesel::update(carts::table.find(cmd.cart_id))
                .set((
                    carts::status.eq(CartStatus::Converted.as_str()),
                    carts::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;

            // 6. The event commits with the order or not at all.
            let line_payloads: Vec<serde_json::Value> = items
                .iter()
                .map(|item| {
                    json!({
                        "product_id": item.product_id,
                        "variant_id": item.variant_id,
                        "quantity": item.quantity,
                        "unit_price": item.unit_price.to_string(),
                    })
                })
                .collect();
            outbox::enqueue(
                conn,
                "Order",
                &order_id.to_string(),
                "OrderPlaced",
                json!({
                    "order_id": order_id,
                    "customer_id": cart.customer_id,
                    "cart_id": cmd.cart_id,
                    "coupon_code": cart.coupon_code,
                    "subtotal": subtotal.to_string(),
                    "discount": discount.to_string(),
                    "shipping_fee": cmd.shipping_fee.to_string(),
                    "total": total.to_string(),
                    "lines": line_payloads,
                }),
            )?;

            let item_rows = load_items(conn, order_id)?;
            order_from_rows(order_row, item_rows)
        })
    }

    fn find(&self, order_id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let row: Option<OrderRow> = orders::table
            .find(order_id)
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;
        let Some(row) = row else {
            return Ok(None);
        };

        let items = load_items(&mut conn, row.id)?;
        order_from_rows(row, items).map(Some)
    }

    fn list(
        &self,
        filter: OrderFilter,
        page: i64,
        limit: i64,
    ) -> Result<Page<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        let offset = (page.max(1) - 1) * limit;

        let mut count_query = orders::table
            .select(diesel::dsl::count_star())
            .into_boxed();
        let mut page_query = orders::table.select(OrderRow::as_select()).into_boxed();
        if let Some(customer_id) = filter.customer_id {
            count_query = count_query.filter(orders::customer_id.eq(customer_id));
            page_query = page_query.filter(orders::customer_id.eq(customer_id));
        }
        if let Some(status) = filter.status {
            count_query = count_query.filter(orders::status.eq(status.as_str()));
            page_query = page_query.filter(orders::status.eq(status.as_str()));
        }

        let total: i64 = count_query.first(&mut conn)?;
        let rows: Vec<OrderRow> = page_query
            .order(orders::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load(&mut conn)?;

        // Listings stay line-free; callers fetch one order for the details.
        let items = rows
            .into_iter()
            .map(|row| order_from_rows(row, vec![]))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page { items, total })
    }

    fn transition(&self, order_id: Uuid, target: OrderStatus) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row: OrderRow = orders::table
                .find(order_id)
                .select(OrderRow::as_select())
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound)?;
            let current = OrderStatus::parse(&row.status)?;
            if !current.can_transition_to(target) {
                return Err(DomainError::invalid_transition(
                    current.as_str(),
                    target.as_str(),
                ));
            }

            // Compare-and-set on the previous status: a transition that
            // lost a race matches zero rows instead of applying twice.
            let updated: Option<OrderRow> = diesel::update(
                orders::table.filter(
                    orders::id
                        .eq(order_id)
                        .and(orders::status.eq(current.as_str())),
                ),
            )
            .set((
                orders::status.eq(target.as_str()),
                orders::updated_at.eq(Utc::now()),
            ))
            .returning(OrderRow::as_returning())
            .get_result(conn)
            .optional()?;
            let row = updated.ok_or_else(|| {
                DomainError::Conflict("order status changed concurrently".into())
            })?;

            outbox::enqueue(
                conn,
                "Order",
                &order_id.to_string(),
                "OrderStatusChanged",
                json!({
                    "order_id": order_id,
                    "from": current.as_str(),
                    "to": target.as_str(),
                }),
            )?;

            let items = load_items(conn, order_id)?;
            order_from_rows(row, items)
        })
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::{BigDecimal, Zero};
    use chrono::{Duration, Utc};
    use diesel::prelude::*;
    use uuid::Uuid;

    use super::DieselOrderRepository;
    use crate::domain::cart::{CartStatus, NewCartItem};
    use crate::domain::coupon::NewCoupon;
    use crate::domain::errors::DomainError;
    use crate::domain::order::{OrderStatus, PlaceOrder};
    use crate::domain::ports::{CartRepository, CouponRepository, OrderRepository};
    use crate::infrastructure::cart_repo::DieselCartRepository;
    use crate::infrastructure::coupon_repo::DieselCouponRepository;
    use crate::infrastructure::models::OutboxEventRow;
    use crate::infrastructure::test_support::setup_db;
    use crate::schema::fulfillment_outbox;

    fn item(quantity: i32, price: i64) -> NewCartItem {
        NewCartItem {
            product_id: Uuid::new_v4(),
            variant_id: None,
            quantity,
            unit_price: BigDecimal::from(price),
        }
    }

    fn place(cart_id: Uuid, shipping: i64) -> PlaceOrder {
        PlaceOrder {
            cart_id,
            address_id: Uuid::new_v4(),
            shipping_fee: BigDecimal::from(shipping),
            now: Utc::now(),
        }
    }

    #[tokio::test]
    async fn placement_totals_add_up() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());

        let cart = carts.create(Uuid::new_v4()).expect("cart");
        carts.add_item(cart.id, item(2, 1_500)).expect("item");
        carts.add_item(cart.id, item(1, 2_000)).expect("item");

        let order = orders.place(place(cart.id, 1_500)).expect("place");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal, BigDecimal::from(5_000));
        assert_eq!(order.discount, BigDecimal::zero());
        assert_eq!(order.total, BigDecimal::from(6_500));
        assert_eq!(order.lines.len(), 2);

        let converted = carts.find(cart.id).expect("find").expect("cart");
        assert_eq!(converted.status, CartStatus::Converted);
    }

    #[tokio::test]
    async fn placement_applies_and_redeems_the_coupon() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let coupons = DieselCouponRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());

        let now = Utc::now();
        coupons
            .create(NewCoupon {
                code: "WELCOME10".into(),
                percent_off: BigDecimal::from(10),
                amount_off: BigDecimal::zero(),
                valid_from: now - Duration::days(1),
                valid_until: now + Duration::days(1),
                max_uses: 1,
                active: true,
            })
            .expect("coupon");

        let cart = carts.create(Uuid::new_v4()).expect("cart");
        carts.add_item(cart.id, item(1, 10_000)).expect("item");
        carts.set_coupon(cart.id, Some("WELCOME10")).expect("apply");

        let order = orders.place(place(cart.id, 0)).expect("place");
        assert_eq!(order.discount, BigDecimal::from(1_000));
        assert_eq!(order.total, BigDecimal::from(9_000));
        assert_eq!(order.coupon_code.as_deref(), Some("WELCOME10"));

        let coupon = coupons.find("WELCOME10").expect("find").expect("exists");
        assert_eq!(coupon.use_count, 1);
    }

    /// Two carts racing on a cap-1 coupon: one order exists afterwards, the
    /// loser's cart is still active and the counter stopped at the cap.
    #[tokio::test]
    async fn exhausted_coupon_aborts_the_whole_placement() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let coupons = DieselCouponRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());

        let now = Utc::now();
        coupons
            .create(NewCoupon {
                code: "WELCOME10".into(),
                percent_off: BigDecimal::from(10),
                amount_off: BigDecimal::zero(),
                valid_from: now - Duration::days(1),
                valid_until: now + Duration::days(1),
                max_uses: 1,
                active: true,
            })
            .expect("coupon");

        let winner = carts.create(Uuid::new_v4()).expect("cart");
        carts.add_item(winner.id, item(1, 10_000)).expect("item");
        carts.set_coupon(winner.id, Some("WELCOME10")).expect("apply");

        let loser = carts.create(Uuid::new_v4()).expect("cart");
        carts.add_item(loser.id, item(1, 8_000)).expect("item");
        carts.set_coupon(loser.id, Some("WELCOME10")).expect("apply");

        let won = orders.place(place(winner.id, 0)).expect("first place");
        assert_eq!(won.total, BigDecimal::from(9_000));

        let err = orders.place(place(loser.id, 0)).expect_err("second place");
        assert!(matches!(err, DomainError::CouponExhausted));

        // All-or-nothing: the losing cart is untouched and no second order
        // or event was committed.
        let cart = carts.find(loser.id).expect("find").expect("cart");
        assert_eq!(cart.status, CartStatus::Active);

        let mut conn = pool.get().expect("conn");
        let events: Vec<OutboxEventRow> = fulfillment_outbox::table
            .filter(fulfillment_outbox::event_type.eq("OrderPlaced"))
            .select(OutboxEventRow::as_select())
            .load(&mut conn)
            .expect("events");
        assert_eq!(events.len(), 1);

        let coupon = coupons.find("WELCOME10").expect("find").expect("exists");
        assert_eq!(coupon.use_count, 1);
    }

    #[tokio::test]
    async fn empty_or_converted_carts_cannot_place() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());

        let cart = carts.create(Uuid::new_v4()).expect("cart");
        let err = orders.place(place(cart.id, 0)).expect_err("empty cart");
        assert!(matches!(err, DomainError::Validation(_)));

        carts.add_item(cart.id, item(1, 900)).expect("item");
        orders.place(place(cart.id, 0)).expect("place");
        let err = orders.place(place(cart.id, 0)).expect_err("already converted");
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn transitions_follow_the_graph_only() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());

        let cart = carts.create(Uuid::new_v4()).expect("cart");
        carts.add_item(cart.id, item(1, 900)).expect("item");
        let order = orders.place(place(cart.id, 0)).expect("place");

        let err = orders
            .transition(order.id, OrderStatus::Shipped)
            .expect_err("pending → shipped skips states");
        assert!(matches!(err, DomainError::InvalidTransition { .. }));

        let order_id = order.id;
        for target in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            let moved = orders.transition(order_id, target).expect("forward step");
            assert_eq!(moved.status, target);
        }

        let err = orders
            .transition(order_id, OrderStatus::Cancelled)
            .expect_err("delivered is terminal");
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn cancelled_orders_stay_on_record() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());

        let cart = carts.create(Uuid::new_v4()).expect("cart");
        carts.add_item(cart.id, item(3, 1_200)).expect("item");
        let order = orders.place(place(cart.id, 500)).expect("place");

        let cancelled = orders
            .transition(order.id, OrderStatus::Cancelled)
            .expect("cancel from pending");
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        // Soft-cancel: the record is still there, money untouched.
        let kept = orders.find(order.id).expect("find").expect("kept");
        assert_eq!(kept.total, order.total);

        let err = orders
            .transition(order.id, OrderStatus::Confirmed)
            .expect_err("terminal");
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn listing_filters_by_customer_and_status() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());

        let customer_id = Uuid::new_v4();
        for _ in 0..3 {
            let cart = carts.create(customer_id).expect("cart");
            carts.add_item(cart.id, item(1, 700)).expect("item");
            orders.place(place(cart.id, 0)).expect("place");
        }

        let all = orders
            .list(
                crate::domain::order::OrderFilter {
                    customer_id: Some(customer_id),
                    status: None,
                },
                1,
                2,
            )
            .expect("list");
        assert_eq!(all.total, 3);
        assert_eq!(all.items.len(), 2);

        let cancelled = orders
            .list(
                crate::domain::order::OrderFilter {
                    customer_id: Some(customer_id),
                    status: Some(OrderStatus::Cancelled),
                },
                1,
                10,
            )
            .expect("list");
        assert_eq!(cancelled.total, 0);
    }
}
