//! Rental coordinator orchestrating the booking, cancel and finish flows.

use std::sync::Arc;

use common::{CarId, CarPage, PaymentId, Rental, RentalId};
use downstream::{CarQuery, CarsService, Credentials, NewRental, PaymentService, RentalService};
use retry_queue::{RetryMessage, RetryPublisher};

use crate::booking::{BookingIntent, RentalPeriod};
use crate::error::{Result, SagaError};
use crate::state::SagaRun;
use crate::steps;
use crate::views::{BookingView, CarSummary, PaymentSummary, RentalView};

/// Orchestrates calls to the cars, payment and rental services.
///
/// Booking runs three steps (book car → create payment → create rental) with
/// synchronous compensation when a later step fails on the callee's side.
/// Cancel and finish hand compensations for unreachable services to the
/// retry queue instead of failing the request.
pub struct RentalCoordinator {
    cars: Arc<dyn CarsService>,
    payment: Arc<dyn PaymentService>,
    rental: Arc<dyn RentalService>,
    retry: Arc<dyn RetryPublisher>,
}

impl RentalCoordinator {
    /// Creates a new rental coordinator.
    pub fn new(
        cars: Arc<dyn CarsService>,
        payment: Arc<dyn PaymentService>,
        rental: Arc<dyn RentalService>,
        retry: Arc<dyn RetryPublisher>,
    ) -> Self {
        Self {
            cars,
            payment,
            rental,
            retry,
        }
    }

    /// Books a car, charges for the period and records the rental.
    #[tracing::instrument(skip(self, intent), fields(saga_type = steps::BOOK_CAR, car_uid = %intent.car_uid))]
    pub async fn book_car(&self, intent: BookingIntent) -> Result<BookingView> {
        let mut run = SagaRun::start(steps::BOOK_CAR);
        let result = self.run_book_car(&mut run, intent).await;
        run.finish(&result);
        result
    }

    async fn run_book_car(&self, run: &mut SagaRun, intent: BookingIntent) -> Result<BookingView> {
        let period = RentalPeriod::parse(&intent.date_from, &intent.date_to)?;
        let credentials = &intent.credentials;

        let car = self
            .cars
            .get(intent.car_uid, credentials)
            .await
            .map_err(|e| SagaError::step(steps::STEP_GET_CAR, e))?;

        tracing::info!(step = steps::STEP_BOOK_CAR, "saga step started");
        self.cars
            .book(car.car_uid, credentials)
            .await
            .map_err(|e| SagaError::step(steps::STEP_BOOK_CAR, e))?;

        tracing::info!(step = steps::STEP_CREATE_PAYMENT, "saga step started");
        let price = period.total_price(car.price);
        let payment = match self.payment.create(price, credentials).await {
            Ok(payment) => payment,
            Err(e) => {
                if !e.is_caller_fault() {
                    run.compensate(steps::STEP_CREATE_PAYMENT);
                    self.revert_book(run, car.car_uid, credentials).await?;
                }
                return Err(SagaError::hiding_unavailable(steps::STEP_CREATE_PAYMENT, e));
            }
        };

        tracing::info!(step = steps::STEP_CREATE_RENTAL, "saga step started");
        let new_rental = NewRental {
            car_uid: car.car_uid,
            payment_uid: payment.payment_uid,
            date_from: period.date_from,
            date_to: period.date_to,
        };
        let rental = match self.rental.create(new_rental, credentials).await {
            Ok(rental) => rental,
            Err(e) => {
                if !e.is_caller_fault() {
                    run.compensate(steps::STEP_CREATE_RENTAL);
                    self.revert_book(run, car.car_uid, credentials).await?;
                    self.revert_payment(run, payment.payment_uid, credentials)
                        .await?;
                }
                return Err(SagaError::step(steps::STEP_CREATE_RENTAL, e));
            }
        };

        tracing::info!(rental_uid = %rental.rental_uid, payment_uid = %payment.payment_uid, "car booked");
        Ok(BookingView::new(rental, payment))
    }

    async fn revert_book(
        &self,
        run: &SagaRun,
        car_uid: CarId,
        credentials: &Credentials,
    ) -> Result<()> {
        let result = self.cars.unbook(car_uid, credentials).await;
        run.compensation(steps::STEP_REVERT_BOOK, result.is_ok());
        result.map_err(|e| SagaError::step(steps::STEP_REVERT_BOOK, e))
    }

    async fn revert_payment(
        &self,
        run: &SagaRun,
        payment_uid: PaymentId,
        credentials: &Credentials,
    ) -> Result<()> {
        let result = self.payment.cancel(payment_uid, credentials).await;
        run.compensation(steps::STEP_REVERT_PAYMENT, result.is_ok());
        result.map_err(|e| SagaError::step(steps::STEP_REVERT_PAYMENT, e))
    }

    /// Cancels a rental, releasing the car and refunding the payment.
    ///
    /// Releasing the car and cancelling the payment fall back to the retry
    /// queue when the respective service is unreachable.
    #[tracing::instrument(skip(self, credentials), fields(saga_type = steps::CANCEL_RENTAL))]
    pub async fn cancel_rental(&self, rental_uid: RentalId, credentials: &Credentials) -> Result<()> {
        let run = SagaRun::start(steps::CANCEL_RENTAL);
        let result = self.run_cancel_rental(&run, rental_uid, credentials).await;
        run.finish(&result);
        result
    }

    async fn run_cancel_rental(
        &self,
        run: &SagaRun,
        rental_uid: RentalId,
        credentials: &Credentials,
    ) -> Result<()> {
        let rental = self.user_rental(rental_uid, credentials).await?;
        self.release_car(run, &rental, credentials).await?;

        self.rental
            .cancel(rental_uid, credentials)
            .await
            .map_err(|e| SagaError::step(steps::STEP_CANCEL_RENTAL, e))?;

        match self.payment.cancel(rental.payment_uid, credentials).await {
            Ok(()) => {
                run.compensation(steps::STEP_CANCEL_PAYMENT, true);
                Ok(())
            }
            Err(e) if e.is_unavailable() => {
                run.compensation(steps::STEP_CANCEL_PAYMENT, false);
                tracing::warn!(payment_uid = %rental.payment_uid, error = %e, "payment service unavailable, deferring cancel");
                self.retry
                    .publish(RetryMessage::payment_cancel(rental.payment_uid));
                Ok(())
            }
            Err(e) => Err(SagaError::step(steps::STEP_CANCEL_PAYMENT, e)),
        }
    }

    /// Finishes a rental and releases the car.
    #[tracing::instrument(skip(self, credentials), fields(saga_type = steps::FINISH_RENTAL))]
    pub async fn finish_rental(&self, rental_uid: RentalId, credentials: &Credentials) -> Result<()> {
        let run = SagaRun::start(steps::FINISH_RENTAL);
        let result = self.run_finish_rental(&run, rental_uid, credentials).await;
        run.finish(&result);
        result
    }

    async fn run_finish_rental(
        &self,
        run: &SagaRun,
        rental_uid: RentalId,
        credentials: &Credentials,
    ) -> Result<()> {
        let rental = self.user_rental(rental_uid, credentials).await?;
        self.release_car(run, &rental, credentials).await?;

        self.rental
            .finish(rental_uid, credentials)
            .await
            .map_err(|e| SagaError::step(steps::STEP_FINISH_RENTAL, e))
    }

    async fn user_rental(&self, rental_uid: RentalId, credentials: &Credentials) -> Result<Rental> {
        self.rental
            .get(rental_uid, credentials)
            .await
            .map_err(|e| SagaError::step(steps::STEP_GET_USER_RENTAL, e))
    }

    async fn release_car(
        &self,
        run: &SagaRun,
        rental: &Rental,
        credentials: &Credentials,
    ) -> Result<()> {
        match self.cars.unbook(rental.car_uid, credentials).await {
            Ok(()) => {
                run.compensation(steps::STEP_MAKE_CAR_AVAILABLE, true);
                Ok(())
            }
            Err(e) if e.is_unavailable() => {
                run.compensation(steps::STEP_MAKE_CAR_AVAILABLE, false);
                tracing::warn!(car_uid = %rental.car_uid, error = %e, "cars service unavailable, deferring unbook");
                self.retry.publish(RetryMessage::car_unbook(rental.car_uid));
                Ok(())
            }
            Err(e) => Err(SagaError::step(steps::STEP_MAKE_CAR_AVAILABLE, e)),
        }
    }

    /// Lists cars. `page` is 1-based.
    #[tracing::instrument(skip(self, credentials))]
    pub async fn list_cars(
        &self,
        page: u32,
        size: u32,
        show_all: bool,
        credentials: &Credentials,
    ) -> Result<CarPage> {
        let query = CarQuery {
            page: page.saturating_sub(1),
            size,
            show_all,
        };
        self.cars
            .list(query, credentials)
            .await
            .map_err(|e| SagaError::step(steps::STEP_LIST_CARS, e))
    }

    /// Returns one of the caller's rentals with car and payment details.
    #[tracing::instrument(skip(self, credentials))]
    pub async fn get_rental(
        &self,
        rental_uid: RentalId,
        credentials: &Credentials,
    ) -> Result<RentalView> {
        let rental = self.user_rental(rental_uid, credentials).await?;
        self.rental_view(rental, credentials).await
    }

    /// Returns all of the caller's rentals with car and payment details.
    #[tracing::instrument(skip(self, credentials))]
    pub async fn list_rentals(&self, credentials: &Credentials) -> Result<Vec<RentalView>> {
        let rentals = self
            .rental
            .list(credentials)
            .await
            .map_err(|e| SagaError::step(steps::STEP_LIST_USER_RENTALS, e))?;

        let mut views = Vec::with_capacity(rentals.len());
        for rental in rentals {
            views.push(self.rental_view(rental, credentials).await?);
        }
        Ok(views)
    }

    /// Enriches a rental. A lookup the caller caused fails the request; any
    /// other lookup failure leaves only the id in the view.
    async fn rental_view(&self, rental: Rental, credentials: &Credentials) -> Result<RentalView> {
        let car = match self.cars.get(rental.car_uid, credentials).await {
            Ok(car) => CarSummary::from(car),
            Err(e) if e.is_caller_fault() => {
                return Err(SagaError::step(steps::STEP_GET_CAR_INFO, e));
            }
            Err(e) => {
                tracing::warn!(car_uid = %rental.car_uid, error = %e, "car info unavailable");
                CarSummary::id_only(rental.car_uid)
            }
        };

        let payment = match self.payment.get(rental.payment_uid, credentials).await {
            Ok(payment) => PaymentSummary::from(payment),
            Err(e) if e.is_caller_fault() => {
                return Err(SagaError::step(steps::STEP_GET_PAYMENT_INFO, e));
            }
            Err(e) => {
                tracing::warn!(payment_uid = %rental.payment_uid, error = %e, "payment info unavailable");
                PaymentSummary::id_only(rental.payment_uid)
            }
        };

        Ok(RentalView::new(rental, car, payment))
    }
}
