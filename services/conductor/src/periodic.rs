//! Periodic background tasks.
//!
//! Tasks register as `(spacing, callable(manager))` pairs and run on
//! independent intervals until shutdown is signaled. The two built-in
//! sweeps are the power-state reconciliation and the async hardware-job
//! poll.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::info;

use crate::config::Config;
use crate::manager::ConductorManager;

/// Callable run on each tick of a periodic task.
pub type PeriodicFn = Arc<dyn Fn(Arc<ConductorManager>) -> BoxFuture<'static, ()> + Send + Sync>;

/// A registered periodic task.
pub struct PeriodicTask {
    pub name: String,
    pub spacing: Duration,
    pub callback: PeriodicFn,
}

impl PeriodicTask {
    pub fn new(name: impl Into<String>, spacing: Duration, callback: PeriodicFn) -> Self {
        Self {
            name: name.into(),
            spacing,
            callback,
        }
    }
}

/// Runs registered periodic tasks until shutdown.
pub struct PeriodicRunner {
    manager: Arc<ConductorManager>,
    tasks: Vec<PeriodicTask>,
}

impl PeriodicRunner {
    pub fn new(manager: Arc<ConductorManager>) -> Self {
        Self {
            manager,
            tasks: Vec::new(),
        }
    }

    /// A runner preloaded with the built-in sweeps at the configured
    /// intervals.
    pub fn with_default_tasks(manager: Arc<ConductorManager>, config: &Config) -> Self {
        let mut runner = Self::new(manager);

        runner.register(PeriodicTask::new(
            "sync-power-states",
            Duration::from_secs(config.power_sync_interval_secs),
            Arc::new(|manager| {
                Box::pin(async move {
                    manager.sync_power_states().await;
                })
            }),
        ));
        runner.register(PeriodicTask::new(
            "sync-async-jobs",
            Duration::from_secs(config.job_poll_interval_secs),
            Arc::new(|manager| {
                Box::pin(async move {
                    manager.sync_async_jobs().await;
                })
            }),
        ));

        runner
    }

    /// Register a periodic task.
    pub fn register(&mut self, task: PeriodicTask) {
        self.tasks.push(task);
    }

    /// Run every registered task until shutdown is signaled.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let mut set = JoinSet::new();

        for task in self.tasks {
            let manager = Arc::clone(&self.manager);
            let mut shutdown = shutdown.clone();

            set.spawn(async move {
                info!(
                    task = %task.name,
                    spacing_secs = task.spacing.as_secs(),
                    "Starting periodic task"
                );

                let mut interval = tokio::time::interval(task.spacing);
                // Don't immediately tick on startup - wait for first interval
                interval.tick().await;

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            (task.callback)(Arc::clone(&manager)).await;
                        }
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                info!(task = %task.name, "Periodic task shutting down");
                                break;
                            }
                        }
                    }
                }
            });
        }

        while set.join_next().await.is_some() {}
    }
}
