use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::Page;
use crate::domain::ports::ShipmentRepository;
use crate::domain::shipment::{NewShipment, Shipment, ShipmentPatch, ShipmentStatus};

/// Tracks delivery or pickup progress, independent of payment. Status only
/// ever advances one step at a time; descriptive fields move separately
/// through `update`.
#[derive(Clone)]
pub struct ShipmentService<R> {
    shipments: R,
}

impl<R: ShipmentRepository> ShipmentService<R> {
    pub fn new(shipments: R) -> Self {
        Self { shipments }
    }

    pub fn create(&self, shipment: NewShipment) -> Result<Shipment, DomainError> {
        self.shipments.create(shipment)
    }

    pub fn get(&self, shipment_id: Uuid) -> Result<Shipment, DomainError> {
        self.shipments
            .find(shipment_id)?
            .ok_or(DomainError::NotFound)
    }

    pub fn find_by_tracking(&self, tracking_code: &str) -> Result<Shipment, DomainError> {
        self.shipments
            .find_by_tracking(tracking_code)?
            .ok_or(DomainError::NotFound)
    }

    pub fn list(
        &self,
        status: Option<ShipmentStatus>,
        page: i64,
        limit: i64,
    ) -> Result<Page<Shipment>, DomainError> {
        self.shipments.list(status, page, limit)
    }

    pub fn update(&self, shipment_id: Uuid, patch: ShipmentPatch) -> Result<Shipment, DomainError> {
        if patch.carrier.is_none() && patch.tracking_code.is_none() && patch.estimated_at.is_none()
        {
            return Err(DomainError::Validation("no fields to update".into()));
        }
        self.shipments.update(shipment_id, patch)
    }

    pub fn update_status(
        &self,
        shipment_id: Uuid,
        target: ShipmentStatus,
    ) -> Result<Shipment, DomainError> {
        self.shipments.transition(shipment_id, target)
    }
}
