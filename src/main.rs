use rust_checkout_api::bin_client::BinlistClient;
use rust_checkout_api::cep_client::{CachedPostalLookup, PostalLookup, ViaCepClient};
use rust_checkout_api::checkout::CheckoutPipeline;
use rust_checkout_api::config::Config;
use rust_checkout_api::db::Database;
use rust_checkout_api::handlers::{self, AppState};
use rust_checkout_api::order_store::{OrderStore, PgOrderStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Connects to the order database, if one is configured.
///
/// A configured but unreachable database does not stop the server: checkouts
/// are then rejected at the persistence stage as "order system unavailable".
async fn connect_order_store(config: &Config) -> Option<Arc<dyn OrderStore>> {
    let url = config.database_url.as_deref()?;

    let db = match Database::new(url).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to connect to the order database: {}", e);
            return None;
        }
    };

    if let Err(e) = db.ensure_schema().await {
        tracing::error!("Failed to prepare the orders table: {}", e);
        return None;
    }

    tracing::info!("Database connection pool established");
    Some(Arc::new(PgOrderStore::new(db.pool)))
}

/// Main entry point for the application.
///
/// Initializes tracing, configuration, the order store, the external lookup
/// clients and the HTTP routes, then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_checkout_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let order_store = connect_order_store(&config).await;

    // Postal lookup client, optionally behind a TTL cache
    let via_cep: Arc<dyn PostalLookup> =
        Arc::new(ViaCepClient::new(config.cep_base_url.clone(), config.http_timeout())?);
    let postal: Arc<dyn PostalLookup> = if config.cep_cache_ttl_secs > 0 {
        tracing::info!(
            "CEP cache initialized ({}s TTL, 10k capacity)",
            config.cep_cache_ttl_secs
        );
        Arc::new(CachedPostalLookup::new(
            via_cep,
            Duration::from_secs(config.cep_cache_ttl_secs),
            10_000,
        ))
    } else {
        via_cep
    };

    let mut pipeline = CheckoutPipeline::new(postal.clone(), config.checkout_options());
    if let Some(store) = order_store {
        pipeline = pipeline.with_order_store(store);
    }
    if config.enable_bin_lookup {
        let bin_client = BinlistClient::new(config.bin_lookup_url.clone(), config.http_timeout())?;
        pipeline = pipeline.with_bin_lookup(Arc::new(bin_client));
    }

    // Build application state
    let app_state = Arc::new(AppState {
        postal,
        pipeline: Arc::new(pipeline),
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?,
    );

    let api_routes = handlers::router(app_state).layer(
        ServiceBuilder::new()
            // Request size limit: 64KB is plenty for checkout payloads
            .layer(RequestBodyLimitLayer::new(64 * 1024))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Static assets are served for every path the API does not handle
    let app = api_routes
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
