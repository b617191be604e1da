//! Cars service client and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Car, CarId, CarPage};
use reqwest::{Method, StatusCode};

use crate::error::{Result, ServiceError};
use crate::http::{Credentials, HttpTransport};
use crate::memory::{CallLog, RecordedCall};

/// Paging parameters for the cars listing (0-based page).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarQuery {
    pub page: u32,
    pub size: u32,
    pub show_all: bool,
}

/// Operations offered by the cars service.
#[async_trait]
pub trait CarsService: Send + Sync {
    /// Lists cars, optionally including unavailable ones.
    async fn list(&self, query: CarQuery, credentials: &Credentials) -> Result<CarPage>;

    /// Loads a single car.
    async fn get(&self, car_id: CarId, credentials: &Credentials) -> Result<Car>;

    /// Marks the car unavailable.
    async fn book(&self, car_id: CarId, credentials: &Credentials) -> Result<Car>;

    /// Marks the car available again. Compensates `book`.
    async fn unbook(&self, car_id: CarId, credentials: &Credentials) -> Result<()>;
}

/// Cars service reached over HTTP.
#[derive(Clone)]
pub struct HttpCarsService {
    transport: HttpTransport,
}

impl HttpCarsService {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl CarsService for HttpCarsService {
    #[tracing::instrument(skip(self, credentials))]
    async fn list(&self, query: CarQuery, credentials: &Credentials) -> Result<CarPage> {
        let request = self
            .transport
            .request(Method::GET, "/api/v1/cars", credentials)
            .query(&[
                ("page", query.page.to_string()),
                ("size", query.size.to_string()),
                ("showAll", query.show_all.to_string()),
            ]);
        self.transport.fetch(request, StatusCode::OK).await
    }

    #[tracing::instrument(skip(self, credentials))]
    async fn get(&self, car_id: CarId, credentials: &Credentials) -> Result<Car> {
        let request =
            self.transport
                .request(Method::GET, &format!("/api/v1/cars/{car_id}"), credentials);
        self.transport.fetch(request, StatusCode::OK).await
    }

    #[tracing::instrument(skip(self, credentials))]
    async fn book(&self, car_id: CarId, credentials: &Credentials) -> Result<Car> {
        let request = self.transport.request(
            Method::POST,
            &format!("/api/v1/cars/{car_id}/book"),
            credentials,
        );
        self.transport.fetch(request, StatusCode::OK).await
    }

    #[tracing::instrument(skip(self, credentials))]
    async fn unbook(&self, car_id: CarId, credentials: &Credentials) -> Result<()> {
        let request = self.transport.request(
            Method::DELETE,
            &format!("/api/v1/cars/{car_id}/book"),
            credentials,
        );
        self.transport.execute(request, StatusCode::NO_CONTENT).await
    }
}

#[derive(Debug, Default)]
struct InMemoryCarsState {
    cars: HashMap<CarId, Car>,
    log: CallLog,
}

/// In-memory cars service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCarsService {
    state: Arc<RwLock<InMemoryCarsState>>,
}

impl InMemoryCarsService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a car.
    pub fn insert(&self, car: Car) {
        self.state.write().unwrap().cars.insert(car.car_uid, car);
    }

    /// Returns the stored copy of a car.
    pub fn car(&self, car_id: CarId) -> Option<Car> {
        self.state.read().unwrap().cars.get(&car_id).cloned()
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

fn car_not_found(car_id: CarId) -> ServiceError {
    ServiceError::internal(404, format!("car {car_id} not found"))
}

#[async_trait]
impl CarsService for InMemoryCarsService {
    async fn list(&self, query: CarQuery, credentials: &Credentials) -> Result<CarPage> {
        let mut state = self.state.write().unwrap();
        state.log.record("list", credentials)?;

        let mut matching: Vec<Car> = state
            .cars
            .values()
            .filter(|car| query.show_all || car.available)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.registration_number.cmp(&b.registration_number));

        let total_elements = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip((query.page * query.size) as usize)
            .take(query.size as usize)
            .collect();

        Ok(CarPage {
            items,
            page: query.page,
            page_size: query.size,
            total_elements,
        })
    }

    async fn get(&self, car_id: CarId, credentials: &Credentials) -> Result<Car> {
        let mut state = self.state.write().unwrap();
        state.log.record("get", credentials)?;
        state
            .cars
            .get(&car_id)
            .cloned()
            .ok_or_else(|| car_not_found(car_id))
    }

    async fn book(&self, car_id: CarId, credentials: &Credentials) -> Result<Car> {
        let mut state = self.state.write().unwrap();
        state.log.record("book", credentials)?;
        let car = state
            .cars
            .get_mut(&car_id)
            .ok_or_else(|| car_not_found(car_id))?;
        if !car.available {
            return Err(ServiceError::internal(409, "car is already booked"));
        }
        car.available = false;
        Ok(car.clone())
    }

    async fn unbook(&self, car_id: CarId, credentials: &Credentials) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.log.record("unbook", credentials)?;
        let car = state
            .cars
            .get_mut(&car_id)
            .ok_or_else(|| car_not_found(car_id))?;
        if car.available {
            return Err(ServiceError::internal(409, "car is not booked"));
        }
        car.available = true;
        Ok(())
    }
}
