//! Booking requests and rental-period validation.

use chrono::NaiveDate;
use common::CarId;
use downstream::Credentials;

use crate::error::{Result, SagaError};
use crate::steps;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One booking request, alive for the duration of the call.
#[derive(Debug, Clone)]
pub struct BookingIntent {
    pub car_uid: CarId,
    pub date_from: String,
    pub date_to: String,
    pub credentials: Credentials,
}

/// A validated rental period of at least one whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalPeriod {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl RentalPeriod {
    /// Parses `YYYY-MM-DD` bounds and checks the span.
    pub fn parse(date_from: &str, date_to: &str) -> Result<Self> {
        let date_from = NaiveDate::parse_from_str(date_from, DATE_FORMAT)
            .map_err(|e| SagaError::invalid(steps::STEP_PARSE_DATE_FROM, e.to_string()))?;
        let date_to = NaiveDate::parse_from_str(date_to, DATE_FORMAT)
            .map_err(|e| SagaError::invalid(steps::STEP_PARSE_DATE_TO, e.to_string()))?;

        let period = Self { date_from, date_to };
        if period.days() < 1 {
            return Err(SagaError::invalid(
                steps::STEP_CHECK_DATES,
                "should rent min to 1 day",
            ));
        }
        Ok(period)
    }

    /// Whole days between the bounds.
    pub fn days(&self) -> i64 {
        (self.date_to - self.date_from).num_days()
    }

    /// Price of the period at `daily_price` per day.
    pub fn total_price(&self, daily_price: i64) -> i64 {
        daily_price.saturating_mul(self.days())
    }
}
