//! SoundDrops API server.

use std::sync::Arc;
use std::time::Duration;

use http::{header, HeaderName, HeaderValue, Method};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sounddrops::adapters::http::{app_router, BillingAppState};
use sounddrops::adapters::postgres::{
    PostgresContentCatalog, PostgresEntitlementStore, PostgresSessionValidator,
};
use sounddrops::adapters::storage::FileContentStorage;
use sounddrops::adapters::stripe::StripePaymentGateway;
use sounddrops::application::handlers::billing::SubscriptionLifecycle;
use sounddrops::config::{AppConfig, ServerConfig};
use sounddrops::domain::foundation::Timestamp;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let store = Arc::new(PostgresEntitlementStore::new(pool.clone()));
    let catalog = Arc::new(PostgresContentCatalog::new(pool.clone()));
    let gateway = Arc::new(StripePaymentGateway::new(config.payment.stripe_config())?);
    if config.payment.is_test_mode() {
        tracing::warn!("Stripe is in test mode");
    }

    let state = BillingAppState {
        catalog: catalog.clone(),
        download_log: catalog,
        storage: Arc::new(FileContentStorage::new(&config.storage.root)),
        transactions: store.clone(),
        purchases: store.clone(),
        subscriptions: store.clone(),
        gateway,
        policy: config.payment.billing_policy(),
        public_url: config.server.public_origin().to_string(),
        allowed_origins: config.server.cors_origins_list(),
    };

    if let Some(period) = config.lifecycle.sweep_interval() {
        spawn_expiry_sweep(SubscriptionLifecycle::new(store), period);
    }

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let app = app_router(state, Arc::new(PostgresSessionValidator::new(pool))).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(request_id))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(CompressionLayer::new())
            .layer(cors_layer(&config.server)),
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "SoundDrops listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// JSON logs in production, human-readable otherwise. `RUST_LOG` wins over
/// the configured level.
fn init_tracing(server: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if server.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Periodically expires overdue subscriptions. Reads already expire lazily,
/// so a failed sweep is only logged.
fn spawn_expiry_sweep(lifecycle: SubscriptionLifecycle, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match lifecycle.sweep(Timestamp::now()).await {
                Ok(0) => {}
                Ok(expired) => tracing::info!(expired, "Expiry sweep finished"),
                Err(e) => tracing::warn!(error = %e, "Expiry sweep failed"),
            }
        }
    });
    tracing::info!(period_secs = period.as_secs(), "Expiry sweep scheduled");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server");
}
