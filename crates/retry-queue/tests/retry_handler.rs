use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{Car, CarId, CarType};
use downstream::{
    Credentials, InMemoryCarsService, InMemoryPaymentService, PaymentService,
    ServiceError,
};
use retry_queue::{
    CappedExponential, CarUnbook, CarUnbookCompensation, FixedDwell, InMemoryRetryQueue, Outcome,
    PaymentCancelCompensation, RetryHandler, RetryKind, RetryMessage, RetryQueueError,
};

fn booked_car() -> Car {
    Car {
        car_uid: CarId::new(),
        brand: "Mercedes Benz".to_string(),
        model: "GLA 250".to_string(),
        registration_number: "ЛО777Х799".to_string(),
        power: Some(249),
        price: 3500,
        available: false,
        car_type: CarType::Sedan,
    }
}

fn stale_unbook(car_uid: CarId) -> Vec<u8> {
    RetryMessage::CarUnbook(CarUnbook {
        car_uid,
        enqueued_at: Some(Utc::now() - chrono::Duration::hours(1)),
        attempt: 0,
    })
    .encode()
    .unwrap()
}

fn unbook_handler(
    cars: &InMemoryCarsService,
    queue: &InMemoryRetryQueue,
) -> RetryHandler<FixedDwell> {
    RetryHandler::new(
        Arc::new(CarUnbookCompensation::new(Arc::new(cars.clone()))),
        Arc::new(queue.clone()),
        FixedDwell::new(Duration::ZERO),
    )
}

#[tokio::test]
async fn test_unbook_succeeds_with_service_credentials() {
    let cars = InMemoryCarsService::new();
    let queue = InMemoryRetryQueue::new();
    let car = booked_car();
    cars.insert(car.clone());

    let handler = unbook_handler(&cars, &queue);
    let outcome = handler
        .handle(Some(&stale_unbook(car.car_uid)), None)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Completed);
    assert!(cars.car(car.car_uid).unwrap().available);
    assert_eq!(cars.calls()[0].credentials, Credentials::Service);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_repeated_unbook_is_not_fatal() {
    let cars = InMemoryCarsService::new();
    let queue = InMemoryRetryQueue::new();
    let car = booked_car();
    cars.insert(car.clone());

    let handler = unbook_handler(&cars, &queue);
    let payload = stale_unbook(car.car_uid);

    assert_eq!(handler.handle(Some(&payload), None).await.unwrap(), Outcome::Completed);
    assert_eq!(handler.handle(Some(&payload), None).await.unwrap(), Outcome::Completed);
    assert_eq!(cars.call_count("unbook"), 2);
    assert!(cars.car(car.car_uid).unwrap().available);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_unbook_of_already_available_car_completes() {
    let cars = InMemoryCarsService::new();
    let queue = InMemoryRetryQueue::new();
    let mut car = booked_car();
    // The inline unbook timed out after the cars service applied it.
    car.available = true;
    cars.insert(car.clone());

    let handler = unbook_handler(&cars, &queue);
    let outcome = handler
        .handle(Some(&stale_unbook(car.car_uid)), None)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Completed);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_other_definitive_unbook_failure_is_requeued() {
    let cars = InMemoryCarsService::new();
    let queue = InMemoryRetryQueue::new();
    let car = booked_car();
    cars.insert(car.clone());
    cars.fail_on("unbook", ServiceError::internal(500, "database is down"));

    let handler = unbook_handler(&cars, &queue);
    let outcome = handler
        .handle(Some(&stale_unbook(car.car_uid)), None)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Requeued);
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn test_failed_unbook_is_requeued_with_next_attempt() {
    let cars = InMemoryCarsService::new();
    let queue = InMemoryRetryQueue::new();
    let car = booked_car();
    cars.insert(car.clone());
    cars.fail_on("unbook", ServiceError::unavailable("connection refused"));

    let handler = unbook_handler(&cars, &queue);
    let outcome = handler
        .handle(Some(&stale_unbook(car.car_uid)), None)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Requeued);
    let requeued = queue.messages();
    assert_eq!(requeued.len(), 1);
    assert_eq!(requeued[0].kind(), RetryKind::CarUnbook);
    assert_eq!(requeued[0].target(), car.car_uid.to_string());
    assert_eq!(requeued[0].attempt(), 1);
    assert!(!cars.car(car.car_uid).unwrap().available);
}

#[tokio::test]
async fn test_definitive_failure_is_still_requeued() {
    let cars = InMemoryCarsService::new();
    let queue = InMemoryRetryQueue::new();

    // Unknown car: the callee answers 404 on every attempt.
    let handler = unbook_handler(&cars, &queue);
    let outcome = handler
        .handle(Some(&stale_unbook(CarId::new())), None)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Requeued);
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn test_requeue_failure_is_reported() {
    let cars = InMemoryCarsService::new();
    let queue = InMemoryRetryQueue::new();
    let car = booked_car();
    cars.insert(car.clone());
    cars.fail_on("unbook", ServiceError::unavailable("connection refused"));
    queue.set_fail_publish(true);

    let handler = unbook_handler(&cars, &queue);
    let result = handler.handle(Some(&stale_unbook(car.car_uid)), None).await;

    assert!(matches!(result, Err(RetryQueueError::Publish(_))));
}

#[tokio::test]
async fn test_malformed_payload_is_dropped() {
    let cars = InMemoryCarsService::new();
    let queue = InMemoryRetryQueue::new();
    let handler = unbook_handler(&cars, &queue);

    assert_eq!(
        handler.handle(Some(b"{not json"), None).await.unwrap(),
        Outcome::Dropped
    );
    assert_eq!(handler.handle(None, None).await.unwrap(), Outcome::Dropped);
    assert_eq!(cars.call_count("unbook"), 0);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_payment_cancel_compensation() {
    let payment = InMemoryPaymentService::new();
    let queue = InMemoryRetryQueue::new();
    let created = payment
        .create(10500, &Credentials::Bearer("user".to_string()))
        .await
        .unwrap();

    let handler = RetryHandler::new(
        Arc::new(PaymentCancelCompensation::new(Arc::new(payment.clone()))),
        Arc::new(queue.clone()),
        FixedDwell::new(Duration::ZERO),
    );
    let payload = RetryMessage::payment_cancel(created.payment_uid)
        .encode()
        .unwrap();

    assert_eq!(
        handler.handle(Some(&payload), None).await.unwrap(),
        Outcome::Completed
    );
    assert_eq!(payment.paid_count(), 0);
    assert!(payment
        .calls()
        .iter()
        .any(|c| c.operation == "cancel" && c.credentials == Credentials::Service));
}

#[tokio::test]
async fn test_bounded_policy_abandons() {
    let cars = InMemoryCarsService::new();
    let queue = InMemoryRetryQueue::new();
    let car = booked_car();
    cars.insert(car.clone());
    cars.fail_on("unbook", ServiceError::unavailable("connection refused"));

    let handler = RetryHandler::new(
        Arc::new(CarUnbookCompensation::new(Arc::new(cars.clone()))),
        Arc::new(queue.clone()),
        CappedExponential {
            base_dwell: Duration::ZERO,
            max_dwell: Duration::ZERO,
            max_attempts: 1,
        },
    );

    let outcome = handler
        .handle(Some(&stale_unbook(car.car_uid)), None)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Abandoned);
    assert!(queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_fresh_message_waits_out_dwell() {
    let cars = InMemoryCarsService::new();
    let queue = InMemoryRetryQueue::new();
    let car = booked_car();
    cars.insert(car.clone());

    let handler = RetryHandler::new(
        Arc::new(CarUnbookCompensation::new(Arc::new(cars.clone()))),
        Arc::new(queue.clone()),
        FixedDwell::default(),
    );
    let payload = RetryMessage::car_unbook(car.car_uid).encode().unwrap();

    let started = tokio::time::Instant::now();
    let outcome = handler.handle(Some(&payload), None).await.unwrap();

    assert_eq!(outcome, Outcome::Completed);
    assert!(started.elapsed() >= Duration::from_secs(9));
}

#[tokio::test(start_paused = true)]
async fn test_record_timestamp_used_when_message_has_none() {
    let cars = InMemoryCarsService::new();
    let queue = InMemoryRetryQueue::new();
    let car = booked_car();
    cars.insert(car.clone());

    let handler = RetryHandler::new(
        Arc::new(CarUnbookCompensation::new(Arc::new(cars.clone()))),
        Arc::new(queue.clone()),
        FixedDwell::default(),
    );
    let payload = format!(r#"{{"carUid":"{}"}}"#, car.car_uid);
    let logged_at = Utc::now() - chrono::Duration::minutes(5);

    let started = tokio::time::Instant::now();
    let outcome = handler
        .handle(Some(payload.as_bytes()), Some(logged_at))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Completed);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(cars.call_count("unbook"), 1);
}
