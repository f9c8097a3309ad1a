//! Conductor manager: the provisioning and power state machine.
//!
//! Every operation here acquires a task, mutates node state through it,
//! and releases on scope exit. Long hardware operations return promptly
//! with an `InProgress` outcome and are finished later by the async-job
//! sweep; the task is never held for the full hardware duration.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use metalplane_states::{Outcome, PowerState, ProvisionState};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{Conductor, JsonMap, Node, NodeStore};
use crate::drivers::{
    pending_jobs, BootDevice, DriverFactory, JobStatus, LogicalDisk, PENDING_JOBS_KEY,
};
use crate::error::{Error, Result};
use crate::resources::ResourceRegistry;
use crate::task::{LockMode, Task, TaskManager};

/// Field changes accepted by [`ConductorManager::update_node`].
#[derive(Debug, Default, Clone)]
pub struct NodeUpdate {
    pub driver: Option<String>,
    pub driver_info: Option<JsonMap>,
    /// `Some(Some(_))` associates, `Some(None)` disassociates.
    pub instance_uuid: Option<Option<Uuid>>,
}

/// Counters from one power-state sweep.
#[derive(Debug, Default, Clone, Copy)]
pub struct PowerSyncStats {
    pub checked: usize,
    pub updated: usize,
    pub errors: usize,
}

/// Counters from one async-job sweep.
#[derive(Debug, Default, Clone, Copy)]
pub struct JobSweepStats {
    pub polled: usize,
    pub resumed: usize,
    pub errors: usize,
}

/// Conductor-level entry points for mutating node state safely.
pub struct ConductorManager {
    store: Arc<NodeStore>,
    tasks: TaskManager,
    factory: Arc<DriverFactory>,
    host: String,
}

impl ConductorManager {
    pub fn new(store: Arc<NodeStore>, factory: Arc<DriverFactory>, host: impl Into<String>) -> Self {
        let host = host.into();
        let registry = Arc::new(ResourceRegistry::new(
            Arc::clone(&store),
            Arc::clone(&factory),
        ));
        let tasks = TaskManager::new(Arc::clone(&store), registry, host.clone());
        Self {
            store,
            tasks,
            factory,
            host,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn store(&self) -> &Arc<NodeStore> {
        &self.store
    }

    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    // -------------------------------------------------------------------
    // Node administration
    // -------------------------------------------------------------------

    /// Enroll a new node under the named driver.
    pub fn create_node(&self, driver: &str, driver_info: JsonMap) -> Result<Node> {
        self.factory.resolve(driver)?;

        let mut node = Node::new(Uuid::new_v4(), driver);
        node.driver_info = driver_info;
        self.store.create_node(&node)?;

        info!(node_id = %node.uuid, driver = %node.driver, "Enrolled node");
        Ok(node)
    }

    pub fn get_node(&self, node_id: Uuid) -> Result<Node> {
        self.store.get_node(node_id)
    }

    pub fn list_nodes(&self) -> Result<Vec<Node>> {
        self.store.list_nodes()
    }

    /// Delete a node. Requires the node to be unreserved (taken here via
    /// an exclusive task) and unassociated.
    pub fn destroy_node(&self, node_id: Uuid) -> Result<()> {
        let task = self
            .tasks
            .acquire(&[node_id], LockMode::Exclusive, "destroy-node")?;
        let node = task.node()?;

        if let Some(instance) = node.instance_uuid {
            return Err(Error::NodeAssociated {
                node: node_id,
                instance,
            });
        }

        self.store.destroy_node(node_id)?;
        info!(node_id = %node_id, "Destroyed node");
        Ok(())
    }

    /// Apply field changes to a node. Fails with `NodeLocked` if the
    /// node is reserved by another holder.
    pub fn update_node(&self, node_id: Uuid, update: NodeUpdate) -> Result<Node> {
        let task = self
            .tasks
            .acquire(&[node_id], LockMode::Exclusive, "update-node")?;
        let current = task.node()?;

        if let Some(driver) = &update.driver {
            self.factory.resolve(driver)?;
        }
        if let Some(Some(instance)) = update.instance_uuid {
            if let Some(existing) = current.instance_uuid {
                if existing != instance {
                    return Err(Error::NodeAssociated {
                        node: node_id,
                        instance: existing,
                    });
                }
            }
        }

        task.update_node(|node| {
            if let Some(driver) = update.driver {
                node.driver = driver;
            }
            if let Some(info) = update.driver_info {
                node.driver_info = info;
            }
            if let Some(instance) = update.instance_uuid {
                node.instance_uuid = instance;
            }
        })
    }

    /// Toggle maintenance mode. Rejects a no-op change.
    pub fn change_node_maintenance_mode(&self, node_id: Uuid, enabled: bool) -> Result<Node> {
        let task = self
            .tasks
            .acquire(&[node_id], LockMode::Exclusive, "maintenance")?;
        let node = task.node()?;

        if node.maintenance == enabled {
            return Err(Error::NodeMaintenanceFailure {
                node: node_id,
                reason: format!(
                    "node is already {} maintenance mode",
                    if enabled { "in" } else { "out of" }
                ),
            });
        }

        let updated = task.update_node(|n| n.maintenance = enabled)?;
        info!(node_id = %node_id, maintenance = enabled, "Changed maintenance mode");
        Ok(updated)
    }

    /// Surface the driver's verdict on the node's `driver_info`.
    pub async fn validate_driver_interfaces(&self, node_id: Uuid) -> Result<()> {
        let task = self
            .tasks
            .acquire(&[node_id], LockMode::Shared, "validate")?;
        let driver = task.driver()?;
        driver.validate(&task).await
    }

    // -------------------------------------------------------------------
    // Power
    // -------------------------------------------------------------------

    /// Read the driver-reported power state under a shared task.
    pub async fn get_node_power_state(&self, node_id: Uuid) -> Result<PowerState> {
        let task = self
            .tasks
            .acquire(&[node_id], LockMode::Shared, "get-power-state")?;
        let driver = task.driver()?;
        driver.get_power_state(&task).await
    }

    /// Drive a node to the requested power state.
    ///
    /// If the driver already reports `target`, no mutating driver call
    /// is made and any stale `target_power_state` / `last_error` is
    /// cleared. No retry happens here; retry policy belongs to the
    /// caller or the driver.
    pub async fn change_node_power_state(&self, node_id: Uuid, target: PowerState) -> Result<()> {
        let task = self
            .tasks
            .acquire(&[node_id], LockMode::Exclusive, "change-power-state")?;
        let driver = task.driver()?;

        let current = driver.get_power_state(&task).await?;
        if current == target {
            debug!(node_id = %node_id, target = %target, "Node already at requested power state");
            let node = task.node()?;
            if node.target_power_state.is_some() || node.last_error.is_some() {
                task.update_node(|n| {
                    n.target_power_state = None;
                    n.last_error = None;
                })?;
            }
            return Ok(());
        }

        driver.validate(&task).await?;
        task.update_node(|n| n.target_power_state = Some(target))?;

        match driver.set_power_state(&task, target).await {
            Ok(()) => {
                task.update_node(|n| {
                    n.power_state = Some(target.resolved());
                    n.target_power_state = None;
                    n.last_error = None;
                })?;
                info!(node_id = %node_id, target = %target, "Changed node power state");
                Ok(())
            }
            Err(e) => {
                task.update_node(|n| {
                    n.target_power_state = None;
                    n.last_error = Some(e.to_string());
                })?;
                warn!(node_id = %node_id, error = %e, "Power state change failed");
                Err(e)
            }
        }
    }

    /// Best-effort reconciliation of recorded power state against the
    /// hardware, for nodes that are neither reserved nor in maintenance.
    /// Per-node errors are logged and the sweep continues.
    pub async fn sync_power_states(&self) -> PowerSyncStats {
        let mut stats = PowerSyncStats::default();

        let nodes = match self.store.list_nodes_for_power_sync() {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(error = %e, "Failed to list nodes for power sync");
                stats.errors += 1;
                return stats;
            }
        };

        for node in nodes {
            stats.checked += 1;
            match self.sync_one_power_state(node.uuid).await {
                Ok(true) => stats.updated += 1,
                Ok(false) => {}
                Err(Error::NodeNotFound(_)) => {
                    debug!(node_id = %node.uuid, "Node disappeared during power sync");
                    stats.errors += 1;
                }
                Err(Error::NodeLocked { .. }) => {
                    debug!(node_id = %node.uuid, "Node reserved during power sync, skipping");
                    stats.errors += 1;
                }
                Err(e) => {
                    warn!(node_id = %node.uuid, error = %e, "Power sync failed for node");
                    stats.errors += 1;
                }
            }
        }

        if stats.updated > 0 {
            info!(
                checked = stats.checked,
                updated = stats.updated,
                "Power state sweep complete"
            );
        }
        stats
    }

    async fn sync_one_power_state(&self, node_id: Uuid) -> Result<bool> {
        let task = self
            .tasks
            .acquire(&[node_id], LockMode::Shared, "sync-power-state")?;
        let driver = task.driver()?;

        let actual = driver.get_power_state(&task).await?;
        let node = task.node()?;
        if node.power_state != Some(actual) {
            task.update_node(|n| n.power_state = Some(actual))?;
            debug!(node_id = %node_id, state = %actual, "Recorded power state change");
            return Ok(true);
        }
        Ok(false)
    }

    // -------------------------------------------------------------------
    // Provisioning
    // -------------------------------------------------------------------

    /// Deploy the node's instance. The node must be deployable
    /// (`nostate`/`available`) and not in maintenance.
    pub async fn do_node_deploy(&self, node_id: Uuid) -> Result<()> {
        let task = self.tasks.acquire(&[node_id], LockMode::Exclusive, "deploy")?;
        let node = task.node()?;

        if node.maintenance {
            return Err(Error::InstanceDeployFailure {
                node: node_id,
                reason: "node is in maintenance mode".to_string(),
            });
        }
        if !matches!(
            node.provision_state,
            ProvisionState::NoState | ProvisionState::Available
        ) {
            return Err(Error::InstanceDeployFailure {
                node: node_id,
                reason: format!(
                    "node is in provision state {}, expected {} or {}",
                    node.provision_state,
                    ProvisionState::NoState,
                    ProvisionState::Available
                ),
            });
        }

        let driver = task.driver()?;
        driver
            .validate(&task)
            .await
            .map_err(|e| Error::InstanceDeployFailure {
                node: node_id,
                reason: format!("driver validation failed: {e}"),
            })?;

        match driver.deploy(&task).await {
            Ok(outcome) => self.apply_outcome(&task, outcome),
            Err(e) => Err(self.record_provision_failure(&task, ProvisionState::Deploying, e)),
        }
    }

    /// Tear down the node's instance. The node must be `active` and not
    /// in maintenance.
    pub async fn do_node_tear_down(&self, node_id: Uuid) -> Result<()> {
        let task = self
            .tasks
            .acquire(&[node_id], LockMode::Exclusive, "tear-down")?;
        let node = task.node()?;

        if node.maintenance {
            return Err(Error::InstanceDeployFailure {
                node: node_id,
                reason: "node is in maintenance mode".to_string(),
            });
        }
        if node.provision_state != ProvisionState::Active {
            return Err(Error::InstanceDeployFailure {
                node: node_id,
                reason: format!(
                    "node is in provision state {}, expected {}",
                    node.provision_state,
                    ProvisionState::Active
                ),
            });
        }

        let driver = task.driver()?;
        match driver.tear_down(&task).await {
            Ok(outcome) => self.apply_outcome(&task, outcome),
            Err(e) => Err(self.record_provision_failure(&task, ProvisionState::Deleting, e)),
        }
    }

    fn apply_outcome(&self, task: &Task, outcome: Outcome) -> Result<()> {
        match outcome {
            Outcome::Completed(final_state) => {
                let node = task.update_node(|n| {
                    n.provision_state = final_state;
                    n.target_provision_state = ProvisionState::NoState;
                    n.last_error = None;
                    if final_state == ProvisionState::NoState {
                        n.instance_uuid = None;
                    }
                })?;
                info!(node_id = %node.uuid, state = %final_state, "Provisioning step completed");
            }
            Outcome::InProgress(eventual) => {
                let step = ProvisionState::step_toward(eventual);
                let node = task.update_node(|n| {
                    n.provision_state = step;
                    n.target_provision_state = eventual;
                    n.last_error = None;
                })?;
                info!(
                    node_id = %node.uuid,
                    state = %step,
                    target = %eventual,
                    "Provisioning step in progress"
                );
            }
        }
        Ok(())
    }

    fn record_provision_failure(
        &self,
        task: &Task,
        in_progress: ProvisionState,
        err: Error,
    ) -> Error {
        let failure = in_progress.failure_state();
        match task.update_node(|n| {
            n.provision_state = failure;
            n.target_provision_state = ProvisionState::NoState;
            n.last_error = Some(err.to_string());
        }) {
            Ok(node) => {
                warn!(node_id = %node.uuid, state = %failure, error = %err, "Provisioning step failed")
            }
            Err(update_err) => {
                warn!(error = %update_err, "Failed to record provisioning failure")
            }
        }
        err
    }

    // -------------------------------------------------------------------
    // RAID and vendor capabilities
    // -------------------------------------------------------------------

    /// Apply a RAID target configuration. A powered-on node is refused;
    /// controllers apply configuration jobs across a power cycle.
    pub async fn create_raid_configuration(
        &self,
        node_id: Uuid,
        target: Vec<LogicalDisk>,
    ) -> Result<()> {
        if target.is_empty() {
            return Err(Error::InvalidParameterValue(
                "target RAID configuration has no logical disks".to_string(),
            ));
        }

        let task = self
            .tasks
            .acquire(&[node_id], LockMode::Exclusive, "create-raid-config")?;
        self.check_powered_off(&task)?;

        let driver = task.driver()?;
        match driver.create_raid_configuration(&task, &target).await {
            Ok(Outcome::Completed(_)) => {
                task.update_node(|n| n.last_error = None)?;
                info!(node_id = %node_id, "RAID configuration applied");
                Ok(())
            }
            Ok(Outcome::InProgress(_)) => {
                info!(node_id = %node_id, "RAID configuration job started");
                Ok(())
            }
            Err(e) => {
                task.update_node(|n| n.last_error = Some(e.to_string()))?;
                warn!(node_id = %node_id, error = %e, "RAID configuration failed");
                Err(e)
            }
        }
    }

    /// Delete the node's RAID configuration.
    pub async fn delete_raid_configuration(&self, node_id: Uuid) -> Result<()> {
        let task = self
            .tasks
            .acquire(&[node_id], LockMode::Exclusive, "delete-raid-config")?;
        self.check_powered_off(&task)?;

        let driver = task.driver()?;
        match driver.delete_raid_configuration(&task).await {
            Ok(Outcome::Completed(_)) => {
                task.update_node(|n| n.last_error = None)?;
                info!(node_id = %node_id, "RAID configuration deleted");
                Ok(())
            }
            Ok(Outcome::InProgress(_)) => {
                info!(node_id = %node_id, "RAID deletion job started");
                Ok(())
            }
            Err(e) => {
                task.update_node(|n| n.last_error = Some(e.to_string()))?;
                warn!(node_id = %node_id, error = %e, "RAID deletion failed");
                Err(e)
            }
        }
    }

    fn check_powered_off(&self, task: &Task) -> Result<()> {
        let node = task.node()?;
        if node.power_state == Some(PowerState::PowerOn) {
            return Err(Error::NodeInWrongPowerState {
                node: node.uuid,
                state: PowerState::PowerOn.to_string(),
            });
        }
        Ok(())
    }

    /// Read the logical disks currently configured on the node.
    pub async fn get_raid_logical_disks(&self, node_id: Uuid) -> Result<Vec<LogicalDisk>> {
        let task = self
            .tasks
            .acquire(&[node_id], LockMode::Shared, "get-logical-disks")?;
        let driver = task.driver()?;
        driver.get_logical_disks(&task).await
    }

    /// Set the device the node boots from.
    pub async fn set_node_boot_device(&self, node_id: Uuid, device: BootDevice) -> Result<()> {
        let task = self
            .tasks
            .acquire(&[node_id], LockMode::Exclusive, "set-boot-device")?;
        let driver = task.driver()?;
        driver.set_boot_device(&task, device).await
    }

    /// Dispatch a vendor-specific driver method.
    pub async fn vendor_passthru(
        &self,
        node_id: Uuid,
        method: &str,
        args: Value,
    ) -> Result<Value> {
        let task = self
            .tasks
            .acquire(&[node_id], LockMode::Exclusive, "vendor-passthru")?;
        let driver = task.driver()?;
        driver.vendor_passthru(&task, method, &args).await
    }

    // -------------------------------------------------------------------
    // Asynchronous continuation
    // -------------------------------------------------------------------

    /// Poll pending hardware jobs and resume the state machine for nodes
    /// whose jobs reached a terminal status. Per-node errors are logged
    /// and the sweep continues.
    pub async fn sync_async_jobs(&self) -> JobSweepStats {
        let mut stats = JobSweepStats::default();

        let nodes = match self.store.list_nodes() {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(error = %e, "Failed to list nodes for job sweep");
                stats.errors += 1;
                return stats;
            }
        };

        for node in nodes {
            if node.maintenance || pending_jobs(&node).is_empty() {
                continue;
            }
            stats.polled += 1;
            match self.check_node_jobs(node.uuid).await {
                Ok(true) => stats.resumed += 1,
                Ok(false) => {}
                Err(Error::NodeNotFound(_)) | Err(Error::NodeLocked { .. }) => {
                    debug!(node_id = %node.uuid, "Node unavailable during job sweep, skipping");
                    stats.errors += 1;
                }
                Err(e) => {
                    warn!(node_id = %node.uuid, error = %e, "Job sweep failed for node");
                    stats.errors += 1;
                }
            }
        }

        if stats.resumed > 0 {
            info!(
                polled = stats.polled,
                resumed = stats.resumed,
                "Async job sweep complete"
            );
        }
        stats
    }

    async fn check_node_jobs(&self, node_id: Uuid) -> Result<bool> {
        let mut task = self
            .tasks
            .acquire(&[node_id], LockMode::Shared, "check-async-jobs")?;
        let node = task.node()?;

        let jobs = pending_jobs(&node);
        if jobs.is_empty() {
            return Ok(false);
        }

        let driver = task.driver()?;
        let mut failure: Option<String> = None;
        let mut all_terminal = true;
        for job_id in &jobs {
            match driver.get_job_status(&task, job_id).await? {
                JobStatus::Running => all_terminal = false,
                JobStatus::Succeeded => {}
                JobStatus::Failed(msg) => {
                    failure = Some(format!("hardware job {job_id} failed: {msg}"));
                }
            }
        }
        if failure.is_none() && !all_terminal {
            return Ok(false);
        }

        // A terminal status means the record is about to change: take
        // the exclusive reservation before clearing the bookkeeping.
        task.upgrade_lock()?;
        task.update_node(|n| {
            n.driver_internal_info.remove(PENDING_JOBS_KEY);
        })?;
        self.resume_after_jobs(&task, failure)?;
        Ok(true)
    }

    fn resume_after_jobs(&self, task: &Task, failure: Option<String>) -> Result<()> {
        let node = task.node()?;

        match failure {
            None => {
                if node.provision_state.in_transition() {
                    let goal = node.target_provision_state;
                    task.update_node(|n| {
                        n.provision_state = goal;
                        n.target_provision_state = ProvisionState::NoState;
                        n.last_error = None;
                        if goal == ProvisionState::NoState {
                            n.instance_uuid = None;
                        }
                    })?;
                    info!(node_id = %node.uuid, state = %goal, "Resumed provisioning after hardware jobs");
                } else {
                    task.update_node(|n| n.last_error = None)?;
                    info!(node_id = %node.uuid, "Hardware jobs completed");
                }
            }
            Some(msg) => {
                if node.provision_state.in_transition() {
                    let failure_state = node.provision_state.failure_state();
                    task.update_node(|n| {
                        n.provision_state = failure_state;
                        n.target_provision_state = ProvisionState::NoState;
                        n.last_error = Some(msg.clone());
                    })?;
                    warn!(
                        node_id = %node.uuid,
                        state = %failure_state,
                        error = %msg,
                        "Hardware job failed; provisioning aborted"
                    );
                } else {
                    task.update_node(|n| n.last_error = Some(msg.clone()))?;
                    warn!(node_id = %node.uuid, error = %msg, "Hardware job failed");
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Conductor registration
    // -------------------------------------------------------------------

    /// Register this conductor and its servable drivers.
    pub fn register(&self) -> Result<Conductor> {
        let drivers = self.factory.names();
        let conductor = self.store.register_conductor(&self.host, &drivers)?;
        info!(hostname = %self.host, drivers = ?conductor.drivers, "Registered conductor");
        Ok(conductor)
    }

    /// Refresh this conductor's heartbeat.
    pub fn heartbeat(&self) -> Result<()> {
        self.store.touch_conductor(&self.host)
    }

    /// Remove this conductor's registration.
    pub fn deregister(&self) -> Result<()> {
        self.store.unregister_conductor(&self.host)?;
        info!(hostname = %self.host, "Deregistered conductor");
        Ok(())
    }

    /// Driver names servable fleet-wide, judged against `window`.
    pub fn active_drivers(&self, window: Duration) -> Result<BTreeSet<String>> {
        self.store.active_driver_names(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::FakeDriver;

    fn manager() -> ConductorManager {
        let store = Arc::new(NodeStore::open_in_memory().unwrap());
        let mut factory = DriverFactory::new();
        factory.register(Arc::new(FakeDriver::new()));
        ConductorManager::new(store, Arc::new(factory), "cond-1")
    }

    #[test]
    fn test_create_node_unknown_driver() {
        let manager = manager();
        let err = manager.create_node("drac", JsonMap::new()).unwrap_err();
        assert!(matches!(err, Error::DriverNotFound(_)));
    }

    #[test]
    fn test_maintenance_mode_rejects_noop() {
        let manager = manager();
        let node = manager.create_node("fake", JsonMap::new()).unwrap();

        let err = manager
            .change_node_maintenance_mode(node.uuid, false)
            .unwrap_err();
        assert!(matches!(err, Error::NodeMaintenanceFailure { .. }));

        let updated = manager
            .change_node_maintenance_mode(node.uuid, true)
            .unwrap();
        assert!(updated.maintenance);
    }

    #[test]
    fn test_update_node_rejects_reassociation() {
        let manager = manager();
        let node = manager.create_node("fake", JsonMap::new()).unwrap();
        let first = Uuid::new_v4();

        manager
            .update_node(
                node.uuid,
                NodeUpdate {
                    instance_uuid: Some(Some(first)),
                    ..Default::default()
                },
            )
            .unwrap();

        let err = manager
            .update_node(
                node.uuid,
                NodeUpdate {
                    instance_uuid: Some(Some(Uuid::new_v4())),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::NodeAssociated { .. }));

        // Disassociate, then associate anew.
        manager
            .update_node(
                node.uuid,
                NodeUpdate {
                    instance_uuid: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();
        let updated = manager
            .update_node(
                node.uuid,
                NodeUpdate {
                    instance_uuid: Some(Some(first)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.instance_uuid, Some(first));
    }

    #[test]
    fn test_destroy_associated_node_fails() {
        let manager = manager();
        let node = manager.create_node("fake", JsonMap::new()).unwrap();
        manager
            .update_node(
                node.uuid,
                NodeUpdate {
                    instance_uuid: Some(Some(Uuid::new_v4())),
                    ..Default::default()
                },
            )
            .unwrap();

        let err = manager.destroy_node(node.uuid).unwrap_err();
        assert!(matches!(err, Error::NodeAssociated { .. }));

        // The failed destroy released its lock.
        assert!(manager
            .get_node(node.uuid)
            .unwrap()
            .reservation
            .is_none());
    }

    #[test]
    fn test_conductor_registration_roundtrip() {
        let manager = manager();
        let conductor = manager.register().unwrap();
        assert_eq!(conductor.hostname, "cond-1");
        assert_eq!(conductor.drivers, vec!["fake".to_string()]);

        manager.heartbeat().unwrap();
        let drivers = manager.active_drivers(Duration::from_secs(60)).unwrap();
        assert!(drivers.contains("fake"));

        manager.deregister().unwrap();
        assert!(matches!(
            manager.heartbeat().unwrap_err(),
            Error::ConductorNotFound(_)
        ));
    }
}
