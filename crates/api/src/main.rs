//! Gateway server entry point.

use std::sync::Arc;

use api::config::ResolverKind;
use api::{AppState, Config, HttpTransport};
use messaging::KafkaEventBus;
use projections::{ResultCache, ResultFeed, ResultIngestor, ResultProjection, ResultStore};
use purchasing::{
    EventPublishingRepository, PurchasingService, RemoteAuthRepository, RemoteProductRepository,
};
use resilience::{
    Channel, ChannelConfig, CircuitBreaker, CircuitBreakerConfig, Endpoint, RateLimiter,
    RegistryResolver, Resolver, ResilientClient, StaticResolver,
};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

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

async fn connect_client(
    name: &str,
    resolver: &dyn Resolver,
    target: &str,
    transport: Arc<HttpTransport>,
    config: &Config,
) -> ResilientClient<HttpTransport> {
    let channel = Channel::connect(resolver, target, transport, ChannelConfig::default())
        .await
        .unwrap_or_else(|err| panic!("failed to connect to {name} at {target}: {err}"));
    ResilientClient::new(
        name,
        RateLimiter::per_second(config.downstream_rps),
        CircuitBreaker::new(
            name,
            CircuitBreakerConfig {
                cool_down: config.breaker_cool_down,
                ..CircuitBreakerConfig::default()
            },
        ),
        channel,
    )
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Resolve and connect the downstream services
    let transport = Arc::new(HttpTransport::new());
    let (resolver, auth_target, product_target): (Box<dyn Resolver>, String, String) =
        match config.resolver {
            ResolverKind::Static => (
                Box::new(StaticResolver::new()),
                config.auth_service_addr.clone(),
                config.product_service_addr.clone(),
            ),
            ResolverKind::Registry => {
                // Seeded from configuration; a discovery loop may update
                // the table while the gateway runs.
                let registry = RegistryResolver::new();
                registry
                    .register(
                        "auth",
                        config
                            .auth_service_addr
                            .split(',')
                            .map(Endpoint::new)
                            .collect(),
                    )
                    .await;
                registry
                    .register(
                        "product",
                        config
                            .product_service_addr
                            .split(',')
                            .map(Endpoint::new)
                            .collect(),
                    )
                    .await;
                (Box::new(registry), "auth".to_string(), "product".to_string())
            }
        };

    let auth_client = connect_client(
        "auth",
        resolver.as_ref(),
        &auth_target,
        Arc::clone(&transport),
        &config,
    )
    .await;
    let product_client = connect_client(
        "product",
        resolver.as_ref(),
        &product_target,
        Arc::clone(&transport),
        &config,
    )
    .await;

    // 4. Connect the event stream
    let bus = Arc::new(
        KafkaEventBus::builder()
            .brokers(&config.kafka_brokers)
            .consumer_group(&config.consumer_group)
            .build()
            .expect("failed to connect to kafka"),
    );

    // 5. Assemble the command path
    let auth = Arc::new(RemoteAuthRepository::new(auth_client));
    let products = Arc::new(RemoteProductRepository::new(product_client));
    let publisher = Arc::new(EventPublishingRepository::new(Arc::clone(&bus)));
    let purchasing = Arc::new(PurchasingService::new(products, publisher));

    // 6. Assemble the result path and start ingestion
    let cache = Arc::new(ResultCache::with_ttl(config.result_ttl));
    let feed = ResultFeed::new();
    let projection = Arc::new(ResultProjection::new(Arc::clone(&cache) as Arc<dyn ResultStore>, feed.clone()));
    let ingestion =
        ResultIngestor::new(Arc::clone(&bus), projection, config.result_workers).spawn();

    // 7. Build and start the server
    let state = Arc::new(AppState::new(auth, purchasing, cache, feed));
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting purchase gateway");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    for handle in ingestion {
        handle.abort();
    }
    tracing::info!("server shut down gracefully");
}
