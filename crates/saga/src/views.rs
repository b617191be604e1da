//! Response shapes assembled from several services.

use chrono::NaiveDate;
use common::{Car, CarId, Payment, PaymentId, PaymentStatus, Rental, RentalId, RentalStatus};
use serde::{Deserialize, Serialize};

/// Payment part of a rental response. Only the id is known when the payment
/// service could not be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub payment_uid: PaymentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
}

impl PaymentSummary {
    pub fn id_only(payment_uid: PaymentId) -> Self {
        Self {
            payment_uid,
            status: None,
            price: None,
        }
    }
}

impl From<Payment> for PaymentSummary {
    fn from(payment: Payment) -> Self {
        Self {
            payment_uid: payment.payment_uid,
            status: Some(payment.status),
            price: Some(payment.price),
        }
    }
}

/// Car part of a rental response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarSummary {
    pub car_uid: CarId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,
}

impl CarSummary {
    pub fn id_only(car_uid: CarId) -> Self {
        Self {
            car_uid,
            brand: None,
            model: None,
            registration_number: None,
        }
    }
}

impl From<Car> for CarSummary {
    fn from(car: Car) -> Self {
        Self {
            car_uid: car.car_uid,
            brand: Some(car.brand),
            model: Some(car.model),
            registration_number: Some(car.registration_number),
        }
    }
}

/// Result of a successful booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub rental_uid: RentalId,
    pub status: RentalStatus,
    pub car_uid: CarId,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub payment: PaymentSummary,
}

impl BookingView {
    pub fn new(rental: Rental, payment: Payment) -> Self {
        Self {
            rental_uid: rental.rental_uid,
            status: rental.status,
            car_uid: rental.car_uid,
            date_from: rental.date_from,
            date_to: rental.date_to,
            payment: payment.into(),
        }
    }
}

/// A user's rental with car and payment details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalView {
    pub rental_uid: RentalId,
    pub status: RentalStatus,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub car: CarSummary,
    pub payment: PaymentSummary,
}

impl RentalView {
    pub fn new(rental: Rental, car: CarSummary, payment: PaymentSummary) -> Self {
        Self {
            rental_uid: rental.rental_uid,
            status: rental.status,
            date_from: rental.date_from,
            date_to: rental.date_to,
            car,
            payment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_view_serializes_ids_only() {
        let rental = Rental {
            rental_uid: RentalId::new(),
            car_uid: CarId::new(),
            payment_uid: PaymentId::new(),
            date_from: NaiveDate::from_ymd_opt(2021, 10, 8).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2021, 10, 11).unwrap(),
            status: RentalStatus::InProgress,
        };
        let view = RentalView::new(
            rental.clone(),
            CarSummary::id_only(rental.car_uid),
            PaymentSummary::id_only(rental.payment_uid),
        );

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "IN_PROGRESS");
        assert_eq!(json["dateFrom"], "2021-10-08");
        assert_eq!(json["car"], serde_json::json!({ "carUid": rental.car_uid.to_string() }));
        assert_eq!(
            json["payment"],
            serde_json::json!({ "paymentUid": rental.payment_uid.to_string() })
        );
    }

    #[test]
    fn test_payment_summary_from_payment() {
        let payment = Payment {
            payment_uid: PaymentId::new(),
            price: 10500,
            status: PaymentStatus::Paid,
        };
        let summary = PaymentSummary::from(payment.clone());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "PAID");
        assert_eq!(json["price"], 10500);
    }
}
