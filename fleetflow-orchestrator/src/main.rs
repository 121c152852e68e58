use std::sync::Arc;

use anyhow::Context;
use fleetflow_client::StageClient;
use fleetflow_orchestrator::config::Config;
use fleetflow_orchestrator::repository::train::{InMemoryTrainStore, PgTrainStore, TrainStore};
use fleetflow_orchestrator::storage::{StorageGateway, spawn_cleanup_task};
use fleetflow_orchestrator::{api, build_state, db};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleetflow_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Fleetflow Orchestrator...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let storage = StorageGateway::new(&config.shared_storage_path);
    storage
        .ensure_directories()
        .await
        .context("Failed to prepare shared storage")?;
    tracing::info!("Shared storage ready at {}", storage.root().display());

    let trains: Arc<dyn TrainStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::create_pool(url)
                .await
                .context("Failed to create database pool")?;
            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            Arc::new(PgTrainStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, train records are kept in memory only");
            Arc::new(InMemoryTrainStore::new())
        }
    };

    let stages = StageClient::new(&config.fast_api_base_uri)
        .with_timeouts(config.simulation_timeout, config.stage_timeout);
    tracing::info!("Stage services at {}", stages.base_url());

    let (state, worker) = build_state(&config, storage.clone(), trains, Arc::new(stages));
    worker.spawn(Arc::clone(&state.pipeline));
    spawn_cleanup_task(
        storage,
        config.temp_cleanup_interval,
        config.temp_cleanup_age,
    );

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
