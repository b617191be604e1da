//! Payment service client and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Payment, PaymentId, PaymentStatus};
use reqwest::{Method, StatusCode};
use serde::Serialize;

use crate::error::{Result, ServiceError};
use crate::http::{Credentials, HttpTransport};
use crate::memory::{CallLog, RecordedCall};

/// Operations offered by the payment service.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Charges `price` and returns the new payment in PAID status.
    async fn create(&self, price: i64, credentials: &Credentials) -> Result<Payment>;

    /// Loads a single payment.
    async fn get(&self, payment_id: PaymentId, credentials: &Credentials) -> Result<Payment>;

    /// Moves the payment to CANCELED. Compensates `create`.
    async fn cancel(&self, payment_id: PaymentId, credentials: &Credentials) -> Result<()>;
}

#[derive(Serialize)]
struct CreatePaymentRequest {
    price: i64,
}

/// Payment service reached over HTTP.
#[derive(Clone)]
pub struct HttpPaymentService {
    transport: HttpTransport,
}

impl HttpPaymentService {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl PaymentService for HttpPaymentService {
    #[tracing::instrument(skip(self, credentials))]
    async fn create(&self, price: i64, credentials: &Credentials) -> Result<Payment> {
        let request = self
            .transport
            .request(Method::POST, "/api/v1/payment", credentials)
            .json(&CreatePaymentRequest { price });
        self.transport.fetch(request, StatusCode::OK).await
    }

    #[tracing::instrument(skip(self, credentials))]
    async fn get(&self, payment_id: PaymentId, credentials: &Credentials) -> Result<Payment> {
        let request = self.transport.request(
            Method::GET,
            &format!("/api/v1/payment/{payment_id}"),
            credentials,
        );
        self.transport.fetch(request, StatusCode::OK).await
    }

    #[tracing::instrument(skip(self, credentials))]
    async fn cancel(&self, payment_id: PaymentId, credentials: &Credentials) -> Result<()> {
        let request = self.transport.request(
            Method::DELETE,
            &format!("/api/v1/payment/{payment_id}"),
            credentials,
        );
        self.transport.execute(request, StatusCode::NO_CONTENT).await
    }
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    payments: HashMap<PaymentId, Payment>,
    log: CallLog,
}

/// In-memory payment service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call to `operation` fail with `err`.
    pub fn fail_on(&self, operation: &'static str, err: ServiceError) {
        self.state.write().unwrap().log.fail(operation, err);
    }

    /// Clears an injected failure.
    pub fn recover(&self, operation: &'static str) {
        self.state.write().unwrap().log.recover(operation);
    }

    /// Returns the stored copy of a payment.
    pub fn payment(&self, payment_id: PaymentId) -> Option<Payment> {
        self.state.read().unwrap().payments.get(&payment_id).cloned()
    }

    /// Number of payments currently in PAID status.
    pub fn paid_count(&self) -> usize {
        self.state
            .read()
            .unwrap()
            .payments
            .values()
            .filter(|p| p.status == PaymentStatus::Paid)
            .count()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.read().unwrap().log.calls()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state.read().unwrap().log.count(operation)
    }
}

fn payment_not_found(payment_id: PaymentId) -> ServiceError {
    ServiceError::internal(404, format!("payment {payment_id} not found"))
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn create(&self, price: i64, credentials: &Credentials) -> Result<Payment> {
        let mut state = self.state.write().unwrap();
        state.log.record("create", credentials)?;
        if price < 0 {
            return Err(ServiceError::Validation {
                message: "invalid payment".to_string(),
                errors: vec![crate::FieldError {
                    field: "price".to_string(),
                    error: "must not be negative".to_string(),
                }],
            });
        }

        let payment = Payment {
            payment_uid: PaymentId::new(),
            price,
            status: PaymentStatus::Paid,
        };
        state.payments.insert(payment.payment_uid, payment.clone());
        Ok(payment)
    }

    async fn get(&self, payment_id: PaymentId, credentials: &Credentials) -> Result<Payment> {
        let mut state = self.state.write().unwrap();
        state.log.record("get", credentials)?;
        state
            .payments
            .get(&payment_id)
            .cloned()
            .ok_or_else(|| payment_not_found(payment_id))
    }

    async fn cancel(&self, payment_id: PaymentId, credentials: &Credentials) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.log.record("cancel", credentials)?;
        let payment = state
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| payment_not_found(payment_id))?;
        payment.status = PaymentStatus::Canceled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Credentials {
        Credentials::Bearer("token".to_string())
    }

    #[tokio::test]
    async fn test_create_and_cancel() {
        let service = InMemoryPaymentService::new();

        let payment = service.create(10500, &user()).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert_eq!(service.paid_count(), 1);

        service.cancel(payment.payment_uid, &user()).await.unwrap();
        assert_eq!(
            service.payment(payment.payment_uid).unwrap().status,
            PaymentStatus::Canceled
        );
        assert_eq!(service.paid_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_twice_is_harmless() {
        let service = InMemoryPaymentService::new();
        let payment = service.create(100, &user()).await.unwrap();

        service.cancel(payment.payment_uid, &Credentials::Service).await.unwrap();
        service.cancel(payment.payment_uid, &Credentials::Service).await.unwrap();
        assert_eq!(service.call_count("cancel"), 2);
    }

    #[tokio::test]
    async fn test_negative_price_is_rejected() {
        let service = InMemoryPaymentService::new();
        let err = service.create(-1, &user()).await.unwrap_err();
        assert!(err.is_caller_fault());
        assert_eq!(service.paid_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_unknown_payment() {
        let service = InMemoryPaymentService::new();
        let err = service.cancel(PaymentId::new(), &user()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal { status: 404, .. }));
    }
}
