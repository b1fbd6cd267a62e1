use chrono::Utc;
use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::payment::{NewPayment, Payment, PaymentStatus};
use crate::domain::ports::PaymentRepository;
use crate::schema::{orders, payments};

use super::models::{NewPaymentRow, OrderRow, PaymentRow};
use super::outbox;

#[derive(Clone)]
pub struct DieselPaymentRepository {
    pool: DbPool,
}

impl DieselPaymentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl PaymentRepository for DieselPaymentRepository {
    fn create(&self, payment: NewPayment) -> Result<Payment, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order: OrderRow = orders::table
                .find(payment.order_id)
                .select(OrderRow::as_select())
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound)?;

            let amount = payment.amount.unwrap_or_else(|| order.total.clone());

            let row: PaymentRow = diesel::insert_into(payments::table)
                .values(&NewPaymentRow {
                    id: Uuid::new_v4(),
                    order_id: order.id,
                    gateway: payment.gateway,
                    method: payment.method,
                    amount: amount.clone(),
                    status: PaymentStatus::Pending.as_str().to_string(),
                    token: payment.token,
                })
                .returning(PaymentRow::as_returning())
                .get_result(conn)?;

            outbox::enqueue(
                conn,
                "Payment",
                &row.id.to_string(),
                "PaymentOpened",
                json!({
                    "payment_id": row.id,
                    "order_id": order.id,
                    "gateway": row.gateway,
                    "method": row.method,
                    "amount": amount.to_string(),
                }),
            )?;

            row.try_into()
        })
    }

    fn find(&self, payment_id: Uuid) -> Result<Option<Payment>, DomainError> {
        let mut conn = self.pool.get()?;
        payments::table
            .find(payment_id)
            .select(PaymentRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Payment::try_from)
            .transpose()
    }

    fn list_for_order(&self, order_id: Uuid) -> Result<Vec<Payment>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows: Vec<PaymentRow> = payments::table
            .filter(payments::order_id.eq(order_id))
            .order(payments::created_at.asc())
            .select(PaymentRow::as_select())
            .load(&mut conn)?;
        rows.into_iter().map(Payment::try_from).collect()
    }

    fn transition(
        &self,
        payment_id: Uuid,
        target: PaymentStatus,
    ) -> Result<Payment, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row: PaymentRow = payments::table
                .find(payment_id)
                .select(PaymentRow::as_select())
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound)?;
            let current = PaymentStatus::parse(&row.status)?;
            if !current.can_transition_to(target) {
                return Err(DomainError::invalid_transition(
                    current.as_str(),
                    target.as_str(),
                ));
            }

            let updated: Option<PaymentRow> = diesel::update(
                payments::table.filter(
                    payments::id
                        .eq(payment_id)
                        .and(payments::status.eq(current.as_str())),
                ),
            )
            .set((
                payments::status.eq(target.as_str()),
                payments::updated_at.eq(Utc::now()),
            ))
            .returning(PaymentRow::as_returning())
            .get_result(conn)
            .optional()?;
            let row = updated.ok_or_else(|| {
                DomainError::Conflict("payment status changed concurrently".into())
            })?;

            outbox::enqueue(
                conn,
                "Payment",
                &payment_id.to_string(),
                "PaymentStatusChanged",
                json!({
                    "payment_id": payment_id,
                    "order_id": row.order_id,
                    "from": current.as_str(),
                    "to": target.as_str(),
                }),
            )?;

            row.try_into()
        })
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use uuid::Uuid;

    use super::DieselPaymentRepository;
    use crate::domain::cart::NewCartItem;
    use crate::domain::errors::DomainError;
    use crate::domain::order::{Order, PlaceOrder};
    use crate::domain::payment::{NewPayment, PaymentStatus};
    use crate::domain::ports::{CartRepository, OrderRepository, PaymentRepository};
    use crate::infrastructure::cart_repo::DieselCartRepository;
    use crate::infrastructure::order_repo::DieselOrderRepository;
    use crate::infrastructure::test_support::setup_db;

    fn placed_order(pool: &crate::db::DbPool) -> Order {
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let cart = carts.create(Uuid::new_v4()).expect("cart");
        carts
            .add_item(
                cart.id,
                NewCartItem {
                    product_id: Uuid::new_v4(),
                    variant_id: None,
                    quantity: 2,
                    unit_price: BigDecimal::from(2_500),
                },
            )
            .expect("item");
        orders
            .place(PlaceOrder {
                cart_id: cart.id,
                address_id: Uuid::new_v4(),
                shipping_fee: BigDecimal::from(0),
                now: Utc::now(),
            })
            .expect("place")
    }

    fn attempt(order_id: Uuid) -> NewPayment {
        NewPayment {
            order_id,
            gateway: "webpay".into(),
            method: "credit_card".into(),
            amount: None,
            token: None,
        }
    }

    #[tokio::test]
    async fn amount_defaults_to_the_order_total() {
        let (_container, pool) = setup_db().await;
        let repo = DieselPaymentRepository::new(pool.clone());
        let order = placed_order(&pool);

        let payment = repo.create(attempt(order.id)).expect("create");
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, order.total);
    }

    #[tokio::test]
    async fn unknown_order_is_rejected() {
        let (_container, pool) = setup_db().await;
        let repo = DieselPaymentRepository::new(pool);

        let err = repo.create(attempt(Uuid::new_v4())).expect_err("no order");
        assert!(matches!(err, DomainError::NotFound));
    }

    #[tokio::test]
    async fn settled_attempts_never_reopen() {
        let (_container, pool) = setup_db().await;
        let repo = DieselPaymentRepository::new(pool.clone());
        let order = placed_order(&pool);

        let payment = repo.create(attempt(order.id)).expect("create");
        let approved = repo
            .transition(payment.id, PaymentStatus::Approved)
            .expect("approve");
        assert_eq!(approved.status, PaymentStatus::Approved);

        let err = repo
            .transition(payment.id, PaymentStatus::Pending)
            .expect_err("approved → pending");
        assert!(matches!(err, DomainError::InvalidTransition { .. }));

        let refunded = repo
            .transition(payment.id, PaymentStatus::Refunded)
            .expect("refund");
        assert_eq!(refunded.status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn an_order_can_accumulate_attempts() {
        let (_container, pool) = setup_db().await;
        let repo = DieselPaymentRepository::new(pool.clone());
        let order = placed_order(&pool);

        let first = repo.create(attempt(order.id)).expect("first attempt");
        repo.transition(first.id, PaymentStatus::Rejected)
            .expect("reject");

        let retry = repo.create(attempt(order.id)).expect("retry");
        repo.transition(retry.id, PaymentStatus::Approved)
            .expect("approve");

        let attempts = repo.list_for_order(order.id).expect("list");
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].status, PaymentStatus::Rejected);
        assert_eq!(attempts[1].status, PaymentStatus::Approved);
    }
}
