//! Rental service client and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{CarId, PaymentId, Rental, RentalId, RentalStatus};
use reqwest::{Method, StatusCode};
use serde::Serialize;

use crate::error::{Result, ServiceError};
use crate::http::{Credentials, HttpTransport};
use crate::memory::{CallLog, RecordedCall};

/// Data needed to open a rental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRental {
    pub car_uid: CarId,
    pub payment_uid: PaymentId,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

/// Operations offered by the rental service. Rentals are scoped to the user
/// behind the credentials.
#[async_trait]
pub trait RentalService: Send + Sync {
    async fn list(&self, credentials: &Credentials) -> Result<Vec<Rental>>;

    /// Opens a rental in IN_PROGRESS status.
    async fn create(&self, rental: NewRental, credentials: &Credentials) -> Result<Rental>;

    async fn get(&self, rental_id: RentalId, credentials: &Credentials) -> Result<Rental>;

    /// Moves the rental to CANCELED.
    async fn cancel(&self, rental_id: RentalId, credentials: &Credentials) -> Result<()>;

    /// Moves the rental to FINISHED.
    async fn finish(&self, rental_id: RentalId, credentials: &Credentials) -> Result<()>;
}

/// Rental service reached over HTTP.
#[derive(Clone)]
pub struct HttpRentalService {
    transport: HttpTransport,
}

impl HttpRentalService {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl RentalService for HttpRentalService {
    #[tracing::instrument(skip(self, credentials))]
    async fn list(&self, credentials: &Credentials) -> Result<Vec<Rental>> {
        let request = self
            .transport
            .request(Method::GET, "/api/v1/rental", credentials);
        self.transport.fetch(request, StatusCode::OK).await
    }

    #[tracing::instrument(skip(self, credentials))]
    async fn create(&self, rental: NewRental, credentials: &Credentials) -> Result<Rental> {
        let request = self
            .transport
            .request(Method::POST, "/api/v1/rental", credentials)
            .json(&rental);
        self.transport.fetch(request, StatusCode::CREATED).await
    }

    #[tracing::instrument(skip(self, credentials))]
    async fn get(&self, rental_id: RentalId, credentials: &Credentials) -> Result<Rental> {
        let request = self.transport.request(
            Method::GET,
            &format!("/api/v1/rental/{rental_id}"),
            credentials,
        );
        self.transport.fetch(request, StatusCode::OK).await
    }

    #[tracing::instrument(skip(self, credentials))]
    async fn cancel(&self, rental_id: RentalId, credentials: &Credentials) -> Result<()> {
        let request = self.transport.request(
            Method::DELETE,
            &format!("/api/v1/rental/{rental_id}"),
            credentials,
        );
        self.transport.execute(request, StatusCode::NO_CONTENT).await
    }

    #[tracing::instrument(skip(self, credentials))]
    async fn finish(&self, rental_id: RentalId, credentials: &Credentials) -> Result<()> {
        let request = self.transport.request(
            Method::POST,
            &format!("/api/v1/rental/{rental_id}/finish"),
            credentials,
        );
        self.transport.execute(request, StatusCode::NO_CONTENT).await
    }
}

#[derive(Debug, Default)]
struct InMemoryRentalState {
    rentals: HashMap<RentalId, (Credentials, Rental)>,
    log: CallLog,
}

impl InMemoryRentalState {
    fn owned_mut(&mut self, rental_id: RentalId, credentials: &Credentials) -> Result<&mut Rental> {
        let (owner, rental) = self.rentals.get_mut(&rental_id).ok_or_else(|| {
            ServiceError::internal(404, format!("rental {rental_id} not found"))
        })?;
        if *owner != *credentials {
            return Err(ServiceError::Forbidden {
                message: "rental belongs to another user".to_string(),
            });
        }
        Ok(rental)
    }
}

/// In-memory rental service for testing. Ownership is keyed by the exact
/// credentials a rental was created with.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRentalService {
    state: Arc<RwLock<InMemoryRentalState>>,
}

impl InMemoryRentalService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a rental owned by `owner`.
    pub fn insert(&self, owner: Credentials, rental: Rental) {
        self.state
            .write()
            .unwrap()
            .rentals
            .insert(rental.rental_uid, (owner, rental));
    }

    /// Returns the stored copy of a rental.
    pub fn rental(&self, rental_id: RentalId) -> Option<Rental> {
        self.state
            .read()
            .unwrap()
            .rentals
            .get(&rental_id)
            .map(|(_, rental)| rental.clone())
    }

    /// Makes every subsequent call to `operation` fail with `err`.
    pub fn fail_on(&self, operation: &'static str, err: ServiceError) {
        self.state.write().unwrap().log.fail(operation, err);
    }

    /// Clears an injected failure.
    pub fn recover(&self, operation: &'static str) {
        self.state.write().unwrap().log.recover(operation);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.read().unwrap().log.calls()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state.read().unwrap().log.count(operation)
    }
}

#[async_trait]
impl RentalService for InMemoryRentalService {
    async fn list(&self, credentials: &Credentials) -> Result<Vec<Rental>> {
        let mut state = self.state.write().unwrap();
        state.log.record("list", credentials)?;
        Ok(state
            .rentals
            .values()
            .filter(|(owner, _)| owner == credentials)
            .map(|(_, rental)| rental.clone())
            .collect())
    }

    async fn create(&self, rental: NewRental, credentials: &Credentials) -> Result<Rental> {
        let mut state = self.state.write().unwrap();
        state.log.record("create", credentials)?;

        let created = Rental {
            rental_uid: RentalId::new(),
            car_uid: rental.car_uid,
            payment_uid: rental.payment_uid,
            date_from: rental.date_from,
            date_to: rental.date_to,
            status: RentalStatus::InProgress,
        };
        state
            .rentals
            .insert(created.rental_uid, (credentials.clone(), created.clone()));
        Ok(created)
    }

    async fn get(&self, rental_id: RentalId, credentials: &Credentials) -> Result<Rental> {
        let mut state = self.state.write().unwrap();
        state.log.record("get", credentials)?;
        state.owned_mut(rental_id, credentials).map(|r| r.clone())
    }

    async fn cancel(&self, rental_id: RentalId, credentials: &Credentials) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.log.record("cancel", credentials)?;
        state.owned_mut(rental_id, credentials)?.status = RentalStatus::Canceled;
        Ok(())
    }

    async fn finish(&self, rental_id: RentalId, credentials: &Credentials) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.log.record("finish", credentials)?;
        state.owned_mut(rental_id, credentials)?.status = RentalStatus::Finished;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_rental() -> NewRental {
        NewRental {
            car_uid: CarId::new(),
            payment_uid: PaymentId::new(),
            date_from: NaiveDate::from_ymd_opt(2021, 10, 8).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2021, 10, 11).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_then_finish() {
        let service = InMemoryRentalService::new();
        let alice = Credentials::Bearer("alice".to_string());

        let rental = service.create(new_rental(), &alice).await.unwrap();
        assert_eq!(rental.status, RentalStatus::InProgress);

        service.finish(rental.rental_uid, &alice).await.unwrap();
        assert_eq!(
            service.rental(rental.rental_uid).unwrap().status,
            RentalStatus::Finished
        );
    }

    #[tokio::test]
    async fn test_other_user_is_forbidden() {
        let service = InMemoryRentalService::new();
        let alice = Credentials::Bearer("alice".to_string());
        let bob = Credentials::Bearer("bob".to_string());

        let rental = service.create(new_rental(), &alice).await.unwrap();

        let err = service.get(rental.rental_uid, &bob).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));
        assert!(service.list(&bob).await.unwrap().is_empty());
        assert_eq!(service.list(&alice).await.unwrap().len(), 1);
    }
}
