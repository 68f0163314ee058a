use anyhow::Context;
use ovocontrol_backend::{
    AppState,
    config::{AppConfig, DeviceMode},
    routes::build_router,
    services::{
        device_client::{DeviceClient, HttpDeviceClient},
        inference_client::{HttpInferenceClient, RetryPolicy},
        operation_store::Stores,
        simulated_device::SimulatedDevice,
    },
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ovocontrol_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    let stores = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let db = Database::connect(database_url)
                .await
                .context("Failed to connect to database")?;

            if config.run_migrations {
                tracing::info!("Running migrations...");
                migration::Migrator::up(&db, None)
                    .await
                    .context("Failed to run migrations")?;
            }

            Stores::sea_orm(db)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, operations are kept in memory only");
            Stores::in_memory()
        }
    };

    let device: Arc<dyn DeviceClient> = match config.device.mode {
        DeviceMode::Http => Arc::new(
            HttpDeviceClient::new(&config.device.base_url, config.device.timeout)
                .context("Failed to build device client")?,
        ),
        DeviceMode::Simulated => {
            tracing::warn!("Using simulated device");
            let simulator = SimulatedDevice::new();
            simulator.set_injection_polls(Some(3));
            simulator.set_homing_polls(2);
            Arc::new(simulator)
        }
    };

    let inference = Arc::new(
        HttpInferenceClient::new(&config.inference.base_url, config.inference.timeout)
            .context("Failed to build inference client")?,
    );

    let retry = RetryPolicy {
        max_retries: config.inference.max_retries,
        delay: config.inference.retry_delay,
    };

    tracing::info!(
        stop_policy = %config.lifecycle.stop_policy,
        history_limit = config.lifecycle.history_limit,
        "Lifecycle settings"
    );

    let state = AppState::new(stores, device, inference, config.lifecycle, retry);
    let app = build_router(state, &config.cors_allowed_origins);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
