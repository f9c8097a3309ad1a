//! Heartbeat loop for the conductor registration.
//!
//! Each conductor registers itself at start-up and refreshes its row
//! periodically; liveness of the fleet (and therefore which drivers are
//! servable) is judged against these timestamps.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::manager::ConductorManager;

/// Register the conductor and refresh its heartbeat until shutdown.
pub async fn run_heartbeat_loop(
    manager: Arc<ConductorManager>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    manager.register()?;

    info!(
        hostname = %manager.host(),
        interval_secs = interval.as_secs(),
        "Starting conductor heartbeat loop"
    );

    let mut consecutive_failures = 0u32;
    let mut interval_timer = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = interval_timer.tick() => {
                match manager.heartbeat() {
                    Ok(()) => {
                        consecutive_failures = 0;
                        debug!(hostname = %manager.host(), "Heartbeat recorded");
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        if consecutive_failures <= 3 {
                            warn!(
                                error = %e,
                                consecutive_failures,
                                "Heartbeat failed"
                            );
                        } else {
                            error!(
                                error = %e,
                                consecutive_failures,
                                "Heartbeat failed repeatedly"
                            );
                        }
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("Heartbeat loop shutting down");
                    break;
                }
            }
        }
    }

    if let Err(e) = manager.deregister() {
        warn!(error = %e, "Failed to deregister conductor");
    }

    Ok(())
}
