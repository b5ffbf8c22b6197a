//! Application configuration loaded from environment variables.

use std::time::Duration;

/// How downstream service targets are resolved to endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverKind {
    /// Comma-separated `host:port` list taken as-is.
    Static,
    /// Dynamic registry populated at runtime.
    Registry,
}

/// Gateway configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DOWNSTREAM_RPS` — rate-limit tokens per second per downstream
///   service (default: `100`)
/// - `BREAKER_COOL_DOWN_SECS` — circuit-breaker cool-down (default: `60`)
/// - `RESULT_TTL_SECS` — result-cache time-to-live (default: `600`)
/// - `KAFKA_BROKERS` — broker list (default: `"localhost:9092"`)
/// - `CONSUMER_GROUP` — result consumer group; empty means fan-out with a
///   per-instance group (default: empty)
/// - `RESULT_WORKERS` — concurrent result consumers (default: `2`)
/// - `RESOLVER` — `"static"` or `"registry"` (default: `"static"`)
/// - `AUTH_SERVICE_ADDR` — identity service target (default:
///   `"localhost:50051"`)
/// - `PRODUCT_SERVICE_ADDR` — catalog service target (default:
///   `"localhost:50052"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub downstream_rps: u32,
    pub breaker_cool_down: Duration,
    pub result_ttl: Duration,
    pub kafka_brokers: String,
    pub consumer_group: String,
    pub result_workers: usize,
    pub resolver: ResolverKind,
    pub auth_service_addr: String,
    pub product_service_addr: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let resolver = match std::env::var("RESOLVER").as_deref() {
            Ok("registry") => ResolverKind::Registry,
            _ => ResolverKind::Static,
        };
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", 3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            downstream_rps: env_or("DOWNSTREAM_RPS", 100),
            breaker_cool_down: Duration::from_secs(env_or("BREAKER_COOL_DOWN_SECS", 60)),
            result_ttl: Duration::from_secs(env_or("RESULT_TTL_SECS", 600)),
            kafka_brokers: std::env::var("KAFKA_BROKERS")
                .unwrap_or_else(|_| "localhost:9092".to_string()),
            consumer_group: std::env::var("CONSUMER_GROUP").unwrap_or_default(),
            result_workers: env_or("RESULT_WORKERS", 2),
            resolver,
            auth_service_addr: std::env::var("AUTH_SERVICE_ADDR")
                .unwrap_or_else(|_| "localhost:50051".to_string()),
            product_service_addr: std::env::var("PRODUCT_SERVICE_ADDR")
                .unwrap_or_else(|_| "localhost:50052".to_string()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            downstream_rps: 100,
            breaker_cool_down: Duration::from_secs(60),
            result_ttl: Duration::from_secs(600),
            kafka_brokers: "localhost:9092".to_string(),
            consumer_group: String::new(),
            result_workers: 2,
            resolver: ResolverKind::Static,
            auth_service_addr: "localhost:50051".to_string(),
            product_service_addr: "localhost:50052".to_string(),
        }
    }
}
