use bigdecimal::{BigDecimal, Zero};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::payment::{NewPayment, Payment, PaymentStatus};
use crate::domain::ports::PaymentRepository;

/// Records payment attempts against an order and moves them through
/// `pending → approved | rejected`, `approved → refunded`. Uniqueness of
/// approval across an order's attempts is the checkout facade's concern.
#[derive(Clone)]
pub struct PaymentService<R> {
    payments: R,
}

impl<R: PaymentRepository> PaymentService<R> {
    pub fn new(payments: R) -> Self {
        Self { payments }
    }

    pub fn create(&self, payment: NewPayment) -> Result<Payment, DomainError> {
        if payment.gateway.trim().is_empty() {
            return Err(DomainError::Validation("gateway must not be empty".into()));
        }
        if payment.method.trim().is_empty() {
            return Err(DomainError::Validation("method must not be empty".into()));
        }
        if let Some(amount) = &payment.amount {
            if *amount < BigDecimal::zero() {
                return Err(DomainError::Validation("amount must not be negative".into()));
            }
        }
        self.payments.create(payment)
    }

    pub fn get(&self, payment_id: Uuid) -> Result<Payment, DomainError> {
        self.payments.find(payment_id)?.ok_or(DomainError::NotFound)
    }

    pub fn list_for_order(&self, order_id: Uuid) -> Result<Vec<Payment>, DomainError> {
        self.payments.list_for_order(order_id)
    }

    pub fn transition(
        &self,
        payment_id: Uuid,
        target: PaymentStatus,
    ) -> Result<Payment, DomainError> {
        self.payments.transition(payment_id, target)
    }
}
