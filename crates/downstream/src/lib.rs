//! Clients for the cars, payment and rental services.
//!
//! Each service is described by a trait with an HTTP implementation and an
//! in-memory implementation for tests. Every remote outcome is classified
//! into a [`ServiceError`] so callers can tell a rejected request from an
//! unreachable service.

pub mod cars;
pub mod error;
pub mod http;
mod memory;
pub mod payment;
pub mod rental;

pub use cars::{CarQuery, CarsService, HttpCarsService, InMemoryCarsService};
pub use error::{FieldError, ServiceError};
pub use http::{Credentials, HttpTransport, SERVICE_PASSWORD_HEADER};
pub use memory::RecordedCall;
pub use payment::{HttpPaymentService, InMemoryPaymentService, PaymentService};
pub use rental::{HttpRentalService, InMemoryRentalService, NewRental, RentalService};
