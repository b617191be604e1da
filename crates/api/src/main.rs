//! Gateway entry point.

use std::sync::Arc;
use std::time::Duration;

use api::AppState;
use api::config::Config;
use downstream::{
    CarsService, HttpCarsService, HttpPaymentService, HttpRentalService, HttpTransport,
    PaymentService,
};
use retry_queue::{
    CarUnbookCompensation, FixedDwell, KafkaRetryProducer, PaymentCancelCompensation,
    RetryConsumer, RetryHandler, RetryPublisher, RetryTopics,
};
use saga::RentalCoordinator;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const KAFKA_CLIENT_ID: &str = "car-rental-system";
const PRODUCER_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Downstream clients
    let client = HttpTransport::client_with_timeout(config.downstream_timeout)
        .expect("failed to build HTTP client");
    let transport = |base_url: &str| {
        HttpTransport::new(client.clone(), base_url, config.service_password.as_str())
    };
    let cars: Arc<dyn CarsService> =
        Arc::new(HttpCarsService::new(transport(&config.cars_service_url)));
    let payment: Arc<dyn PaymentService> =
        Arc::new(HttpPaymentService::new(transport(&config.payment_service_url)));
    let rental = Arc::new(HttpRentalService::new(transport(&config.rental_service_url)));

    // 4. Retry queue producer and consumers
    let brokers = config.bootstrap_servers();
    let topics = RetryTopics {
        car_unbook: config.car_unbook_topic.clone(),
        payment_cancel: config.payment_cancel_topic.clone(),
    };
    let producer = KafkaRetryProducer::new(&brokers, KAFKA_CLIENT_ID, topics.clone())
        .expect("failed to create Kafka producer");
    let publisher: Arc<dyn RetryPublisher> = Arc::new(producer.clone());
    let dwell = FixedDwell::new(config.retry_min_dwell);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let car_consumer = RetryConsumer::new(
        &brokers,
        &config.kafka_group_id,
        &topics.car_unbook,
        RetryHandler::new(
            Arc::new(CarUnbookCompensation::new(cars.clone())),
            publisher.clone(),
            dwell,
        ),
    )
    .expect("failed to create car unbook consumer");
    let payment_consumer = RetryConsumer::new(
        &brokers,
        &config.kafka_group_id,
        &topics.payment_cancel,
        RetryHandler::new(
            Arc::new(PaymentCancelCompensation::new(payment.clone())),
            publisher.clone(),
            dwell,
        ),
    )
    .expect("failed to create payment cancel consumer");

    let consumers = [
        car_consumer.spawn(shutdown_rx.clone()),
        payment_consumer.spawn(shutdown_rx),
    ];

    // 5. Build the application
    let coordinator = RentalCoordinator::new(cars, payment, rental, publisher);
    let app = api::create_app(Arc::new(AppState { coordinator }), metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting gateway");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 7. Drain background work
    let _ = shutdown_tx.send(true);
    for consumer in consumers {
        if let Err(e) = consumer.await {
            tracing::error!(error = %e, "retry consumer task panicked");
        }
    }
    if let Err(e) = producer.flush(PRODUCER_FLUSH_TIMEOUT) {
        tracing::warn!(error = %e, "retry producer flush incomplete");
    }

    tracing::info!("gateway shut down gracefully");
}
