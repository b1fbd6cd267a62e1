use diesel::prelude::*;
use diesel::PgConnection;
use serde_json::Value;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::AlertSink;
use crate::schema::fulfillment_outbox;

use super::models::NewOutboxEventRow;

/// Append an event row. Callers pass the connection of the transaction that
/// produces the state change, so the event is committed if and only if the
/// change is.
pub fn enqueue(
    conn: &mut PgConnection,
    aggregate_type: &str,
    aggregate_id: &str,
    event_type: &str,
    payload: Value,
) -> Result<(), DomainError> {
    diesel::insert_into(fulfillment_outbox::table)
        .values(&NewOutboxEventRow {
            id: Uuid::new_v4(),
            aggregate_type: aggregate_type.to_string(),
            aggregate_id: aggregate_id.to_string(),
            event_type: event_type.to_string(),
            payload,
        })
        .execute(conn)?;
    Ok(())
}

/// Outbox-backed alert channel for the checkout facade. Alerts happen after
/// the surrounding writes have already committed, so they use their own
/// connection.
#[derive(Clone)]
pub struct DieselOutbox {
    pool: DbPool,
}

impl DieselOutbox {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AlertSink for DieselOutbox {
    fn raise(&self, event_type: &str, payload: Value) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let aggregate_id = payload
            .get("order_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default();
        enqueue(&mut conn, "Alert", &aggregate_id, event_type, payload)
    }
}
