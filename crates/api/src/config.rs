//! Application configuration loaded from environment variables.

use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_RETRY_MIN_DWELL_SECS: u64 = 10;
const DEFAULT_DOWNSTREAM_TIMEOUT_SECS: u64 = 10;

/// Gateway configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `8080`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `CARS_SERVICE_URL`, `PAYMENT_SERVICE_URL`, `RENTAL_SERVICE_URL` — downstream base URLs
/// - `SERVICE_PASSWORD` — shared secret for service-to-service calls
/// - `KAFKA_BROKERS` — comma-separated broker list
/// - `KAFKA_CAR_UNBOOK_TOPIC`, `KAFKA_PAYMENT_CANCEL_TOPIC` — retry topics
/// - `KAFKA_GROUP_ID` — retry consumer group (default: `"car-rental-system"`)
/// - `RETRY_MIN_DWELL_SECS` — minimum wait before a retry (default: `10`)
/// - `DOWNSTREAM_TIMEOUT_SECS` — per-request timeout for downstream calls (default: `10`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub cars_service_url: String,
    pub payment_service_url: String,
    pub rental_service_url: String,
    pub service_password: String,
    pub kafka_brokers: Vec<String>,
    pub car_unbook_topic: String,
    pub payment_cancel_topic: String,
    pub kafka_group_id: String,
    pub retry_min_dwell: Duration,
    pub downstream_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);
        let secs = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            host: string("HOST", defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: string("RUST_LOG", defaults.log_level),
            cars_service_url: string("CARS_SERVICE_URL", defaults.cars_service_url),
            payment_service_url: string("PAYMENT_SERVICE_URL", defaults.payment_service_url),
            rental_service_url: string("RENTAL_SERVICE_URL", defaults.rental_service_url),
            service_password: string("SERVICE_PASSWORD", defaults.service_password),
            kafka_brokers: lookup("KAFKA_BROKERS")
                .map(|v| parse_brokers(&v))
                .unwrap_or(defaults.kafka_brokers),
            car_unbook_topic: string("KAFKA_CAR_UNBOOK_TOPIC", defaults.car_unbook_topic),
            payment_cancel_topic: string(
                "KAFKA_PAYMENT_CANCEL_TOPIC",
                defaults.payment_cancel_topic,
            ),
            kafka_group_id: string("KAFKA_GROUP_ID", defaults.kafka_group_id),
            retry_min_dwell: secs("RETRY_MIN_DWELL_SECS", defaults.retry_min_dwell),
            downstream_timeout: secs("DOWNSTREAM_TIMEOUT_SECS", defaults.downstream_timeout),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Broker list in the form the Kafka client expects.
    pub fn bootstrap_servers(&self) -> String {
        self.kafka_brokers.join(",")
    }
}

fn parse_brokers(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
            cars_service_url: "http://localhost:8070".to_string(),
            payment_service_url: "http://localhost:8050".to_string(),
            rental_service_url: "http://localhost:8060".to_string(),
            service_password: String::new(),
            kafka_brokers: vec!["localhost:9092".to_string()],
            car_unbook_topic: "cars-service-retry".to_string(),
            payment_cancel_topic: "payment-service-retry".to_string(),
            kafka_group_id: "car-rental-system".to_string(),
            retry_min_dwell: Duration::from_secs(DEFAULT_RETRY_MIN_DWELL_SECS),
            downstream_timeout: Duration::from_secs(DEFAULT_DOWNSTREAM_TIMEOUT_SECS),
        }
    }
}
