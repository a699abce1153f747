//! FleetPulse Server: real-time driver presence and position broadcast.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use fleetpulse_admission::{AdmissionController, AdmissionSweeper, TracingAlertNotifier};
use fleetpulse_api::{AppState, build_app};
use fleetpulse_core::config::{AppConfig, StoreBackend};
use fleetpulse_core::error::AppError;
use fleetpulse_database::memory::{MemoryFleetDirectory, MemoryPositionStore};
use fleetpulse_database::repositories::{FleetRepository, PositionRepository};
use fleetpulse_database::{DatabasePool, FleetDirectory, PositionStore};
use fleetpulse_geo::{GeocodingProvider, NominatimGeocoder, RetryingGeocoder};
use fleetpulse_realtime::RealtimeEngine;

#[tokio::main]
async fn main() {
    let env = std::env::var("FLEETPULSE_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Connects the configured store backend.
async fn open_stores(
    config: &AppConfig,
) -> Result<(Arc<dyn PositionStore>, Arc<dyn FleetDirectory>), AppError> {
    match config.database.backend {
        StoreBackend::Postgres => {
            let db = DatabasePool::connect(&config.database).await?;
            if config.database.run_migrations {
                fleetpulse_database::migration::run_migrations(db.pool()).await?;
            }
            Ok((
                Arc::new(PositionRepository::new(db.pool().clone())),
                Arc::new(FleetRepository::new(db.pool().clone())),
            ))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory stores; positions are lost on restart");
            Ok((
                Arc::new(MemoryPositionStore::new()),
                Arc::new(MemoryFleetDirectory::new()),
            ))
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting FleetPulse v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Stores ───────────────────────────────────────────
    let (store, directory) = open_stores(&config).await?;

    // ── Step 2: Admission controller + sweeper ───────────────────
    let admission = Arc::new(AdmissionController::new(
        Arc::clone(&directory),
        Arc::new(TracingAlertNotifier),
        config.admission.clone(),
    ));
    let sweeper = AdmissionSweeper::new(Arc::clone(&admission)).await?;
    sweeper.register(&config.admission.sweep_cron).await?;
    sweeper.start().await?;

    // ── Step 3: Geocoding ────────────────────────────────────────
    let nominatim: Arc<dyn GeocodingProvider> = Arc::new(NominatimGeocoder::new(&config.geocoding)?);
    let geocoder = Arc::new(RetryingGeocoder::new(nominatim, &config.geocoding));

    // ── Step 4: Real-time engine ─────────────────────────────────
    let engine = Arc::new(RealtimeEngine::new(
        config.realtime.clone(),
        config.availability.clone(),
        store,
        directory,
        admission,
        geocoder,
    ));

    // ── Step 5: HTTP server ──────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = build_app(AppState::new(Arc::new(config.clone()), Arc::clone(&engine)));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(addr = %addr, "FleetPulse server listening");

    // ── Step 6: Graceful shutdown ────────────────────────────────
    let shutdown_engine = Arc::clone(&engine);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
            // Open sockets only finish once the engine tells them to.
            if let Err(e) = shutdown_engine.shutdown().await {
                tracing::error!(error = %e, "Engine shutdown failed");
            }
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    sweeper.shutdown().await?;

    tracing::info!("FleetPulse server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
