//! services/api/src/bin/api.rs

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use timetable_api::{
    adapters::{FileStore, PgStore},
    config::{Config, StoreBackend},
    error::ApiError,
    web::{create_router, AppState},
};
use timetable_core::{MemoryStore, TimetableStore};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Opens the configured backend. Nothing past this point knows which one it is.
async fn open_store(backend: &StoreBackend) -> Result<Arc<dyn TimetableStore>, ApiError> {
    match backend {
        StoreBackend::File { data_dir } => {
            info!("Using JSON file store in {}", data_dir.display());
            Ok(Arc::new(FileStore::open(data_dir).await?))
        }
        StoreBackend::Postgres { database_url } => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let store = PgStore::new(db_pool);
            info!("Running database migrations...");
            store.run_migrations().await?;
            info!("Database migrations complete.");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open the Store & Seed Admin Credentials ---
    let store = open_store(&config.backend).await?;
    store.seed_credentials(&config.admin).await?;
    info!(backend = store.backend_name(), "Store ready");

    // --- 3. Build the Shared AppState & Router ---
    let app_state = AppState::new(store, config.api_key.clone());
    let app = create_router(app_state);

    // --- 4. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
