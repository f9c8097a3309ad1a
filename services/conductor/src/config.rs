//! Configuration for the conductor.

use anyhow::Result;

/// Conductor configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity of this conductor; also the reservation holder string.
    pub hostname: String,

    /// Path to the shared SQLite database file.
    pub db_path: String,

    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,

    /// Interval between power-state reconciliation sweeps, in seconds.
    pub power_sync_interval_secs: u64,

    /// Interval between async hardware-job polls, in seconds.
    pub job_poll_interval_secs: u64,

    /// Window within which a conductor heartbeat counts as alive.
    pub liveness_window_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let hostname = std::env::var("METAL_HOSTNAME")
            .or_else(|_| std::env::var("HOSTNAME"))
            .unwrap_or_else(|_| "localhost".to_string());

        let db_path = std::env::var("METAL_DB_PATH")
            .unwrap_or_else(|_| "/var/lib/metalplane/metalplane.db".to_string());

        let heartbeat_interval_secs = std::env::var("METAL_HEARTBEAT_INTERVAL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let power_sync_interval_secs = std::env::var("METAL_POWER_SYNC_INTERVAL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        let job_poll_interval_secs = std::env::var("METAL_JOB_POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let liveness_window_secs = std::env::var("METAL_LIVENESS_WINDOW")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(90);

        let log_level = std::env::var("METAL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            hostname,
            db_path,
            heartbeat_interval_secs,
            power_sync_interval_secs,
            job_poll_interval_secs,
            liveness_window_secs,
            log_level,
        })
    }
}
