use anyhow::Context;
use courier_api::{app, AppState, AuthConfig};
use courier_catalog::PricingEngine;
use courier_order::OrderManager;
use courier_store::app_config::Config;
use courier_store::{build_geocoder, DbClient, StoreFoodCatalog, StoreOrderRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Courier API on port {}", config.server.port);

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let geocoder = build_geocoder(&config.geocoding).context("Failed to build geocoder")?;
    tracing::info!(
        addon_price_source = ?config.pricing.addon_price_source,
        "Pricing configured"
    );

    let orders = OrderManager::new(
        Arc::new(StoreOrderRepository::new(db.pool.clone())),
        Arc::new(StoreFoodCatalog::new(db.pool.clone())),
        geocoder,
        PricingEngine::new(config.pricing.clone()),
        config.geocoding.timeout(),
    );

    let app_state = AppState {
        orders: Arc::new(orders),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
