//! Shared identifiers and wire models used across the gateway crates.

pub mod models;
pub mod types;

pub use models::{Car, CarPage, CarType, Payment, PaymentStatus, Rental, RentalStatus};
pub use types::{CarId, PaymentId, RentalId};
