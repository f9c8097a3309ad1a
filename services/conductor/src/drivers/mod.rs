//! Hardware driver capability interface.
//!
//! Each hardware family (DRAC, IPMI, iLO, ...) implements [`Driver`];
//! the core never talks to hardware any other way. Driver instances are
//! resolved by name through an explicit [`DriverFactory`] registered at
//! process start.
//!
//! Every state-mutating entry point begins with
//! [`crate::task::require_exclusive`]; a driver that skips the check
//! breaks the locking contract.

pub mod fake;

pub use fake::{FakeBehavior, FakeDriver};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use metalplane_states::{Outcome, PowerState};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::Node;
use crate::error::{Error, Result};
use crate::task::Task;

/// Key under which pending hardware job ids are kept in a node's
/// `driver_internal_info` between the call that started them and the
/// periodic poll that finishes them.
pub const PENDING_JOBS_KEY: &str = "pending_job_ids";

/// Device a node should boot from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootDevice {
    Pxe,
    Disk,
    Cdrom,
    Bios,
}

/// Terminal or pending status of an asynchronous hardware job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Still executing on the management controller.
    Running,
    Succeeded,
    Failed(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// A logical disk in a RAID target configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalDisk {
    pub size_gb: u32,
    pub raid_level: String,
    #[serde(default)]
    pub controller: Option<String>,
    #[serde(default)]
    pub root_volume: bool,
}

/// Capability interface implemented by each hardware family.
///
/// Methods take the task the call executes under so implementations can
/// reach the cached node record and enforce the exclusive-lock
/// precondition on mutating entry points.
#[async_trait]
pub trait Driver: std::fmt::Debug + Send + Sync {
    /// Name this driver registers under; node records refer to it.
    fn name(&self) -> &str;

    /// Check that the node's `driver_info` is sufficient to manage it.
    async fn validate(&self, task: &Task) -> Result<()>;

    /// Read the current power state from the management controller.
    async fn get_power_state(&self, task: &Task) -> Result<PowerState>;

    /// Drive the node to the requested power state.
    async fn set_power_state(&self, task: &Task, target: PowerState) -> Result<()>;

    /// Set the device the node boots from.
    async fn set_boot_device(&self, task: &Task, device: BootDevice) -> Result<()>;

    /// Provision the node's instance.
    async fn deploy(&self, task: &Task) -> Result<Outcome>;

    /// Remove the node's instance.
    async fn tear_down(&self, task: &Task) -> Result<Outcome>;

    /// Apply a RAID target configuration.
    async fn create_raid_configuration(
        &self,
        task: &Task,
        target: &[LogicalDisk],
    ) -> Result<Outcome>;

    /// Delete the existing RAID configuration.
    async fn delete_raid_configuration(&self, task: &Task) -> Result<Outcome>;

    /// Read the logical disks currently configured.
    async fn get_logical_disks(&self, task: &Task) -> Result<Vec<LogicalDisk>>;

    /// Poll an asynchronous hardware job started by an earlier call.
    async fn get_job_status(&self, task: &Task, job_id: &str) -> Result<JobStatus>;

    /// Dispatch a vendor-specific method by name.
    async fn vendor_passthru(&self, task: &Task, method: &str, args: &Value) -> Result<Value>;
}

/// Resolves driver names to shared driver instances.
///
/// Node records carry a driver name; this factory is the only place the
/// name becomes an instance, so swapping a hardware family in or out is
/// a registration change rather than a load-path change.
#[derive(Default)]
pub struct DriverFactory {
    drivers: BTreeMap<String, Arc<dyn Driver>>,
}

impl DriverFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under its own name.
    pub fn register(&mut self, driver: Arc<dyn Driver>) {
        self.drivers.insert(driver.name().to_string(), driver);
    }

    /// Resolve a driver by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Driver>> {
        self.drivers
            .get(name)
            .cloned()
            .ok_or_else(|| Error::DriverNotFound(name.to_string()))
    }

    /// Names of every registered driver.
    pub fn names(&self) -> Vec<String> {
        self.drivers.keys().cloned().collect()
    }
}

/// Append a hardware job id to the node's pending bookkeeping.
///
/// Called by drivers from within an exclusive task when an operation
/// returns `InProgress`.
pub fn record_pending_job(task: &Task, job_id: &str) -> Result<()> {
    task.update_node(|node| {
        let jobs = node
            .driver_internal_info
            .entry(PENDING_JOBS_KEY.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = jobs {
            list.push(Value::String(job_id.to_string()));
        }
    })?;
    Ok(())
}

/// Pending hardware job ids recorded on a node, if any.
pub fn pending_jobs(node: &Node) -> Vec<String> {
    node.driver_internal_info
        .get(PENDING_JOBS_KEY)
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
