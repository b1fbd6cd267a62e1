use chrono::Utc;
use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::Page;
use crate::domain::ports::ShipmentRepository;
use crate::domain::shipment::{NewShipment, Shipment, ShipmentPatch, ShipmentStatus};
use crate::schema::shipments;

use super::models::{NewShipmentRow, ShipmentChanges, ShipmentRow};
use super::outbox;

#[derive(Clone)]
pub struct DieselShipmentRepository {
    pool: DbPool,
}

impl DieselShipmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ShipmentRepository for DieselShipmentRepository {
    fn create(&self, shipment: NewShipment) -> Result<Shipment, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row: ShipmentRow = diesel::insert_into(shipments::table)
                .values(&NewShipmentRow {
                    id: Uuid::new_v4(),
                    order_id: shipment.order_id,
                    kind: shipment.kind.as_str().to_string(),
                    carrier: shipment.carrier,
                    tracking_code: shipment.tracking_code,
                    estimated_at: shipment.estimated_at,
                    status: ShipmentStatus::Pending.as_str().to_string(),
                })
                .returning(ShipmentRow::as_returning())
                .get_result(conn)?;

            outbox::enqueue(
                conn,
                "Shipment",
                &row.id.to_string(),
                "ShipmentOpened",
                json!({
                    "shipment_id": row.id,
                    "order_id": row.order_id,
                    "kind": row.kind,
                }),
            )?;

            row.try_into()
        })
    }

    fn find(&self, shipment_id: Uuid) -> Result<Option<Shipment>, DomainError> {
        let mut conn = self.pool.get()?;
        shipments::table
            .find(shipment_id)
            .select(ShipmentRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Shipment::try_from)
            .transpose()
    }

    fn find_by_tracking(&self, tracking_code: &str) -> Result<Option<Shipment>, DomainError> {
        let mut conn = self.pool.get()?;
        shipments::table
            .filter(shipments::tracking_code.eq(tracking_code.to_string()))
            .select(ShipmentRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Shipment::try_from)
            .transpose()
    }

    fn list(
        &self,
        status: Option<ShipmentStatus>,
        page: i64,
        limit: i64,
    ) -> Result<Page<Shipment>, DomainError> {
        let mut conn = self.pool.get()?;
        let offset = (page.max(1) - 1) * limit;

        let mut count_query = shipments::table
            .select(diesel::dsl::count_star())
            .into_boxed();
        let mut page_query = shipments::table
            .select(ShipmentRow::as_select())
            .into_boxed();
        if let Some(status) = status {
            count_query = count_query.filter(shipments::status.eq(status.as_str()));
            page_query = page_query.filter(shipments::status.eq(status.as_str()));
        }

        let total: i64 = count_query.first(&mut conn)?;
        let rows: Vec<ShipmentRow> = page_query
            .order(shipments::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load(&mut conn)?;

        Ok(Page {
            items: rows
                .into_iter()
                .map(Shipment::try_from)
                .collect::<Result<Vec<_>, _>>()?,
            total,
        })
    }

    fn update(&self, shipment_id: Uuid, patch: ShipmentPatch) -> Result<Shipment, DomainError> {
        let mut conn = self.pool.get()?;
        let row: Option<ShipmentRow> = diesel::update(shipments::table.find(shipment_id))
            .set((
                &ShipmentChanges {
                    carrier: patch.carrier,
                    tracking_code: patch.tracking_code,
                    estimated_at: patch.estimated_at,
                },
                shipments::updated_at.eq(Utc::now()),
            ))
            .returning(ShipmentRow::as_returning())
            .get_result(&mut conn)
            .optional()?;
        row.ok_or(DomainError::NotFound)?.try_into()
    }

    fn transition(
        &self,
        shipment_id: Uuid,
        target: ShipmentStatus,
    ) -> Result<Shipment, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row: ShipmentRow = shipments::table
                .find(shipment_id)
                .select(ShipmentRow::as_select())
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound)?;
            let current = ShipmentStatus::parse(&row.status)?;
            if !current.can_transition_to(target) {
                return Err(DomainError::invalid_transition(
                    current.as_str(),
                    target.as_str(),
                ));
            }

            let updated: Option<ShipmentRow> = diesel::update(
                shipments::table.filter(
                    shipments::id
                        .eq(shipment_id)
                        .and(shipments::status.eq(current.as_str())),
                ),
            )
            .set((
                shipments::status.eq(target.as_str()),
                shipments::updated_at.eq(Utc::now()),
            ))
            .returning(ShipmentRow::as_returning())
            .get_result(conn)
            .optional()?;
            let row = updated.ok_or_else(|| {
                DomainError::Conflict("shipment status changed concurrently".into())
            })?;

            outbox::enqueue(
                conn,
                "Shipment",
                &shipment_id.to_string(),
                "ShipmentStatusChanged",
                json!({
                    "shipment_id": shipment_id,
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
    use uuid::Uuid;

    use super::DieselShipmentRepository;
    use crate::domain::errors::DomainError;
    use crate::domain::ports::ShipmentRepository;
    use crate::domain::shipment::{NewShipment, ShipmentKind, ShipmentPatch, ShipmentStatus};
    use crate::infrastructure::test_support::setup_db;

    fn delivery() -> NewShipment {
        NewShipment {
            order_id: Uuid::new_v4(),
            kind: ShipmentKind::Delivery,
            carrier: None,
            tracking_code: None,
            estimated_at: None,
        }
    }

    #[tokio::test]
    async fn advances_one_step_at_a_time() {
        let (_container, pool) = setup_db().await;
        let repo = DieselShipmentRepository::new(pool);

        let shipment = repo.create(delivery()).expect("create");
        assert_eq!(shipment.status, ShipmentStatus::Pending);

        let err = repo
            .transition(shipment.id, ShipmentStatus::Delivered)
            .expect_err("pending → delivered skips en_route");
        assert!(matches!(err, DomainError::InvalidTransition { .. }));

        let en_route = repo
            .transition(shipment.id, ShipmentStatus::EnRoute)
            .expect("en_route");
        assert_eq!(en_route.status, ShipmentStatus::EnRoute);

        let delivered = repo
            .transition(shipment.id, ShipmentStatus::Delivered)
            .expect("delivered");
        assert_eq!(delivered.status, ShipmentStatus::Delivered);

        let err = repo
            .transition(shipment.id, ShipmentStatus::EnRoute)
            .expect_err("no way back");
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn patch_leaves_status_alone() {
        let (_container, pool) = setup_db().await;
        let repo = DieselShipmentRepository::new(pool);

        let shipment = repo.create(delivery()).expect("create");
        let updated = repo
            .update(
                shipment.id,
                ShipmentPatch {
                    carrier: Some("chilexpress".into()),
                    tracking_code: Some("CX-194-221".into()),
                    estimated_at: None,
                },
            )
            .expect("update");
        assert_eq!(updated.carrier.as_deref(), Some("chilexpress"));
        assert_eq!(updated.status, ShipmentStatus::Pending);

        let by_tracking = repo
            .find_by_tracking("CX-194-221")
            .expect("lookup")
            .expect("found");
        assert_eq!(by_tracking.id, shipment.id);
    }

    #[tokio::test]
    async fn unknown_shipment_is_not_found() {
        let (_container, pool) = setup_db().await;
        let repo = DieselShipmentRepository::new(pool);

        let err = repo
            .transition(Uuid::new_v4(), ShipmentStatus::EnRoute)
            .expect_err("missing");
        assert!(matches!(err, DomainError::NotFound));
        assert!(repo.find_by_tracking("NOPE").expect("lookup").is_none());
    }
}
