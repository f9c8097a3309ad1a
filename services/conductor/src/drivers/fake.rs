//! Fake hardware driver for testing and development.
//!
//! Power state lives in an in-process map, deploy/tear-down/RAID
//! behavior is selectable per instance, and asynchronous operations
//! mint job ids whose statuses tests flip at will.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use metalplane_states::{Outcome, PowerState, ProvisionState};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::task::{require_exclusive, Task};

use super::{record_pending_job, BootDevice, Driver, JobStatus, LogicalDisk};

/// What the fake should do when asked to deploy, tear down or touch
/// RAID configuration.
#[derive(Debug, Clone)]
pub enum FakeBehavior {
    /// Finish synchronously.
    Complete,
    /// Start a hardware job and report `InProgress`.
    Async,
    /// Report a hardware failure.
    Fail(String),
}

/// Fake driver.
#[derive(Debug)]
pub struct FakeDriver {
    power: Mutex<HashMap<Uuid, PowerState>>,
    deploy: FakeBehavior,
    tear_down: FakeBehavior,
    raid: FakeBehavior,
    fail_power: bool,
    fail_validate: bool,
    disks: Mutex<Vec<LogicalDisk>>,
    job_counter: AtomicU64,
    job_statuses: Mutex<HashMap<String, JobStatus>>,
    validate_calls: AtomicU32,
    set_power_calls: AtomicU32,
    deploy_calls: AtomicU32,
}

impl FakeDriver {
    /// A fake where everything succeeds synchronously.
    pub fn new() -> Self {
        Self {
            power: Mutex::new(HashMap::new()),
            deploy: FakeBehavior::Complete,
            tear_down: FakeBehavior::Complete,
            raid: FakeBehavior::Complete,
            fail_power: false,
            fail_validate: false,
            disks: Mutex::new(Vec::new()),
            job_counter: AtomicU64::new(1),
            job_statuses: Mutex::new(HashMap::new()),
            validate_calls: AtomicU32::new(0),
            set_power_calls: AtomicU32::new(0),
            deploy_calls: AtomicU32::new(0),
        }
    }

    pub fn with_deploy(mut self, behavior: FakeBehavior) -> Self {
        self.deploy = behavior;
        self
    }

    pub fn with_tear_down(mut self, behavior: FakeBehavior) -> Self {
        self.tear_down = behavior;
        self
    }

    pub fn with_raid(mut self, behavior: FakeBehavior) -> Self {
        self.raid = behavior;
        self
    }

    /// Make every power mutation fail.
    pub fn with_power_failure(mut self) -> Self {
        self.fail_power = true;
        self
    }

    /// Make `validate` reject the node's `driver_info`.
    pub fn with_validate_failure(mut self) -> Self {
        self.fail_validate = true;
        self
    }

    /// Seed the power state the controller will report for a node.
    pub fn seed_power(&self, node: Uuid, state: PowerState) {
        self.lock_power().insert(node, state);
    }

    /// Flip a previously minted job to a terminal status.
    pub fn finish_job(&self, job_id: &str, status: JobStatus) {
        self.lock_jobs().insert(job_id.to_string(), status);
    }

    /// Job ids minted so far, in order.
    pub fn minted_jobs(&self) -> Vec<String> {
        let mut jobs: Vec<String> = self.lock_jobs().keys().cloned().collect();
        jobs.sort();
        jobs
    }

    pub fn validate_call_count(&self) -> u32 {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn set_power_call_count(&self) -> u32 {
        self.set_power_calls.load(Ordering::SeqCst)
    }

    pub fn deploy_call_count(&self) -> u32 {
        self.deploy_calls.load(Ordering::SeqCst)
    }

    fn lock_power(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, PowerState>> {
        self.power.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, HashMap<String, JobStatus>> {
        self.job_statuses.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn next_job_id(&self) -> String {
        let counter = self.job_counter.fetch_add(1, Ordering::SeqCst);
        format!("JID_{:06}", counter)
    }

    fn start_job(&self, task: &Task) -> Result<String> {
        let job_id = self.next_job_id();
        self.lock_jobs().insert(job_id.clone(), JobStatus::Running);
        record_pending_job(task, &job_id)?;
        Ok(job_id)
    }

    fn run_behavior(
        &self,
        task: &Task,
        behavior: &FakeBehavior,
        completed: ProvisionState,
        goal: ProvisionState,
    ) -> Result<Outcome> {
        match behavior {
            FakeBehavior::Complete => Ok(Outcome::Completed(completed)),
            FakeBehavior::Async => {
                let job_id = self.start_job(task)?;
                debug!(job_id = %job_id, "[FAKE] Started hardware job");
                Ok(Outcome::InProgress(goal))
            }
            FakeBehavior::Fail(msg) => Err(Error::DriverOperation(msg.clone())),
        }
    }
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for FakeDriver {
    fn name(&self) -> &str {
        "fake"
    }

    async fn validate(&self, task: &Task) -> Result<()> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        let node = task.node()?;
        if self.fail_validate {
            return Err(Error::InvalidParameterValue(format!(
                "driver_info for node {} is incomplete",
                node.uuid
            )));
        }
        Ok(())
    }

    async fn get_power_state(&self, task: &Task) -> Result<PowerState> {
        let node = task.node()?;
        let state = self
            .lock_power()
            .get(&node.uuid)
            .copied()
            .unwrap_or(PowerState::PowerOff);
        debug!(node_id = %node.uuid, state = %state, "[FAKE] Read power state");
        Ok(state)
    }

    async fn set_power_state(&self, task: &Task, target: PowerState) -> Result<()> {
        require_exclusive(task)?;
        self.set_power_calls.fetch_add(1, Ordering::SeqCst);

        let node = task.node()?;
        if self.fail_power {
            return Err(Error::DriverOperation(format!(
                "controller for node {} rejected the power command",
                node.uuid
            )));
        }

        info!(node_id = %node.uuid, target = %target, "[FAKE] Setting power state");
        self.lock_power().insert(node.uuid, target.resolved());
        Ok(())
    }

    async fn set_boot_device(&self, task: &Task, device: BootDevice) -> Result<()> {
        require_exclusive(task)?;
        let node = task.node()?;
        debug!(node_id = %node.uuid, device = ?device, "[FAKE] Setting boot device");
        Ok(())
    }

    async fn deploy(&self, task: &Task) -> Result<Outcome> {
        require_exclusive(task)?;
        self.deploy_calls.fetch_add(1, Ordering::SeqCst);

        let node = task.node()?;
        info!(node_id = %node.uuid, "[FAKE] Deploying");
        self.run_behavior(
            task,
            &self.deploy,
            ProvisionState::Active,
            ProvisionState::Active,
        )
    }

    async fn tear_down(&self, task: &Task) -> Result<Outcome> {
        require_exclusive(task)?;

        let node = task.node()?;
        info!(node_id = %node.uuid, "[FAKE] Tearing down");
        self.run_behavior(
            task,
            &self.tear_down,
            ProvisionState::NoState,
            ProvisionState::NoState,
        )
    }

    async fn create_raid_configuration(
        &self,
        task: &Task,
        target: &[LogicalDisk],
    ) -> Result<Outcome> {
        require_exclusive(task)?;

        let node = task.node()?;
        info!(
            node_id = %node.uuid,
            disks = target.len(),
            "[FAKE] Creating RAID configuration"
        );
        let current = node.provision_state;
        let outcome = self.run_behavior(task, &self.raid, current, current)?;
        if matches!(outcome, Outcome::Completed(_)) {
            *self.disks.lock().unwrap_or_else(|p| p.into_inner()) = target.to_vec();
        }
        Ok(outcome)
    }

    async fn delete_raid_configuration(&self, task: &Task) -> Result<Outcome> {
        require_exclusive(task)?;

        let node = task.node()?;
        info!(node_id = %node.uuid, "[FAKE] Deleting RAID configuration");
        let current = node.provision_state;
        let outcome = self.run_behavior(task, &self.raid, current, current)?;
        if matches!(outcome, Outcome::Completed(_)) {
            self.disks.lock().unwrap_or_else(|p| p.into_inner()).clear();
        }
        Ok(outcome)
    }

    async fn get_logical_disks(&self, _task: &Task) -> Result<Vec<LogicalDisk>> {
        Ok(self.disks.lock().unwrap_or_else(|p| p.into_inner()).clone())
    }

    async fn get_job_status(&self, _task: &Task, job_id: &str) -> Result<JobStatus> {
        self.lock_jobs()
            .get(job_id)
            .cloned()
            .ok_or_else(|| Error::InvalidParameterValue(format!("unknown hardware job {job_id}")))
    }

    async fn vendor_passthru(&self, task: &Task, method: &str, args: &Value) -> Result<Value> {
        let node = task.node()?;
        match method {
            "ping" => Ok(serde_json::json!({ "node": node.uuid.to_string(), "alive": true })),
            "set_bios_config" => {
                require_exclusive(task)?;
                debug!(node_id = %node.uuid, "[FAKE] Applying BIOS settings");
                Ok(serde_json::json!({ "applied": args }))
            }
            other => Err(Error::InvalidParameterValue(format!(
                "unknown vendor method {other}"
            ))),
        }
    }
}
