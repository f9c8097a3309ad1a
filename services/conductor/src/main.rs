//! metalplane Conductor
//!
//! The conductor process manages bare-metal node lifecycle: it competes
//! with other conductors for per-node exclusive reservations over one
//! shared store, drives power and provisioning changes through hardware
//! drivers, and reconciles state with periodic sweeps.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use metalplane_conductor::config::Config;
use metalplane_conductor::db::NodeStore;
use metalplane_conductor::drivers::{DriverFactory, FakeDriver};
use metalplane_conductor::heartbeat;
use metalplane_conductor::manager::ConductorManager;
use metalplane_conductor::periodic::PeriodicRunner;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting metalplane conductor");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        hostname = %config.hostname,
        db_path = %config.db_path,
        "Configuration loaded"
    );

    // Open the shared store
    let store = Arc::new(NodeStore::open(&config.db_path)?);

    // Register drivers (fake only until hardware families land)
    let mut factory = DriverFactory::new();
    factory.register(Arc::new(FakeDriver::new()));

    let manager = Arc::new(ConductorManager::new(
        store,
        Arc::new(factory),
        config.hostname.clone(),
    ));

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start the heartbeat loop
    let heartbeat_handle = tokio::spawn({
        let manager = Arc::clone(&manager);
        let interval = std::time::Duration::from_secs(config.heartbeat_interval_secs);
        let shutdown_rx = shutdown_rx.clone();
        async move { heartbeat::run_heartbeat_loop(manager, interval, shutdown_rx).await }
    });

    // Start the periodic sweeps
    let runner = PeriodicRunner::with_default_tasks(Arc::clone(&manager), &config);
    let runner_handle = tokio::spawn({
        let shutdown_rx = shutdown_rx.clone();
        async move {
            runner.run(shutdown_rx).await;
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = heartbeat_handle => {
            match result {
                Ok(Ok(())) => info!("Heartbeat loop exited normally"),
                Ok(Err(e)) => error!(error = %e, "Heartbeat loop error"),
                Err(e) => error!(error = %e, "Heartbeat task panicked"),
            }
        }
        _ = runner_handle => {
            info!("Periodic runner exited");
        }
    }

    // Signal shutdown to all workers
    let _ = shutdown_tx.send(true);

    // Give workers time to shut down gracefully
    info!("Waiting for workers to shut down...");
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;

    info!("Conductor shutdown complete");
    Ok(())
}
