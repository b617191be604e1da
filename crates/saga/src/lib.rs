//! Saga orchestration for car rentals.
//!
//! The booking saga spans three services that fail independently:
//! 1. Book the car
//! 2. Create the payment
//! 3. Create the rental
//!
//! When a later step fails on the callee's side, earlier steps are
//! compensated in reverse order before the error is returned. Cancel and
//! finish hand compensations for unreachable services to the retry queue.

pub mod booking;
pub mod coordinator;
pub mod error;
pub mod state;
pub mod steps;
pub mod views;

pub use booking::{BookingIntent, RentalPeriod};
pub use coordinator::RentalCoordinator;
pub use error::{Result, SagaError};
pub use state::SagaState;
pub use views::{BookingView, CarSummary, PaymentSummary, RentalView};
