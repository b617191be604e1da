//! Records owned by the backend services, as they travel over the wire.
//!
//! The gateway never persists these; it holds transient copies while a
//! request is in flight.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{CarId, PaymentId, RentalId};

/// Car body type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CarType {
    Sedan,
    Suv,
    Minivan,
    Roadster,
}

/// A car as returned by the cars service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub car_uid: CarId,
    pub brand: String,
    pub model: String,
    pub registration_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<i32>,
    /// Price per rental day.
    pub price: i64,
    pub available: bool,
    #[serde(rename = "type")]
    pub car_type: CarType,
}

/// One page of the cars listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarPage {
    pub items: Vec<Car>,
    pub page: u32,
    pub page_size: u32,
    pub total_elements: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
    Canceled,
}

/// A payment as returned by the payment service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_uid: PaymentId,
    pub price: i64,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalStatus {
    InProgress,
    Finished,
    Canceled,
}

/// A rental as returned by the rental service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub rental_uid: RentalId,
    pub car_uid: CarId,
    pub payment_uid: PaymentId,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub status: RentalStatus,
}
