//! Task manager: the acquisition/release boundary for node access.
//!
//! A [`Task`] scopes one operation's access to one or more nodes. In
//! exclusive mode the task holds the system-wide reservation on every
//! node for its lifetime; in shared mode it only holds the in-process
//! resource binding and coexists freely with other shared tasks.
//!
//! Acquisition never blocks: it succeeds immediately or fails with
//! `NodeLocked`. Release is guaranteed on every exit path via `Drop`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::{Node, NodeStore};
use crate::drivers::Driver;
use crate::error::{Error, Result};
use crate::resources::{NodeResource, ResourceRegistry};

/// Lock mode a task is acquired in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Read-only binding; no reservation taken.
    Shared,
    /// Sole authorized mutator; reservation held for the task lifetime.
    Exclusive,
}

/// Hands out scoped [`Task`] handles over the reservation store and the
/// resource registry.
pub struct TaskManager {
    store: Arc<NodeStore>,
    registry: Arc<ResourceRegistry>,
    host: String,
    seq: AtomicU64,
}

impl TaskManager {
    pub fn new(store: Arc<NodeStore>, registry: Arc<ResourceRegistry>, host: String) -> Self {
        Self {
            store,
            registry,
            host,
            seq: AtomicU64::new(0),
        }
    }

    /// The reservation holder identity this manager acquires under.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Acquire a task over the given nodes.
    ///
    /// Exclusive mode reserves every node first (all-or-nothing), then
    /// binds resources; on any failure, reservations and bindings taken
    /// by this call are rolled back before the error returns. Shared
    /// mode skips the reservation store entirely.
    pub fn acquire(&self, node_ids: &[Uuid], mode: LockMode, purpose: &str) -> Result<Task> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let owner = format!("{}:{}#{}", self.host, purpose, seq);

        if mode == LockMode::Exclusive {
            self.store.reserve_nodes(&self.host, node_ids)?;
        }

        let mut resources = Vec::with_capacity(node_ids.len());
        for (bound, id) in node_ids.iter().enumerate() {
            match self.registry.acquire(*id, &owner) {
                Ok(resource) => resources.push(resource),
                Err(e) => {
                    for done in &node_ids[..bound] {
                        self.registry.release(*done, &owner);
                    }
                    if mode == LockMode::Exclusive {
                        release_reservations(&self.store, &self.host, node_ids);
                    }
                    return Err(e);
                }
            }
        }

        debug!(
            owner = %owner,
            mode = ?mode,
            nodes = node_ids.len(),
            "Acquired task"
        );

        Ok(Task {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            host: self.host.clone(),
            owner,
            node_ids: node_ids.to_vec(),
            resources,
            mode,
        })
    }
}

/// Scoped handle binding node ids, lock mode and driver instances for
/// the lifetime of one operation. Never persisted.
pub struct Task {
    store: Arc<NodeStore>,
    registry: Arc<ResourceRegistry>,
    host: String,
    owner: String,
    node_ids: Vec<Uuid>,
    resources: Vec<Arc<NodeResource>>,
    mode: LockMode,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("host", &self.host)
            .field("owner", &self.owner)
            .field("node_ids", &self.node_ids)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Task {
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    pub fn is_shared(&self) -> bool {
        self.mode == LockMode::Shared
    }

    pub fn node_ids(&self) -> &[Uuid] {
        &self.node_ids
    }

    /// The reservation holder identity of the owning conductor.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Take the exclusive reservation on this task's nodes without
    /// creating a new handle. Fails with `NodeLocked` if any other
    /// holder exists; a task already exclusive is left as-is.
    pub fn upgrade_lock(&mut self) -> Result<()> {
        if self.mode == LockMode::Exclusive {
            return Ok(());
        }

        self.store.reserve_nodes(&self.host, &self.node_ids)?;
        self.mode = LockMode::Exclusive;

        // The cached records predate the reservation; refresh them so
        // writers see current rows.
        for (id, resource) in self.node_ids.iter().zip(&self.resources) {
            if let Ok(node) = self.store.get_node(*id) {
                resource.replace_node(node);
            }
        }

        debug!(owner = %self.owner, "Upgraded task to exclusive");
        Ok(())
    }

    fn single_resource(&self) -> Result<&Arc<NodeResource>> {
        if self.resources.len() != 1 {
            return Err(Error::MultiNodeTask);
        }
        Ok(&self.resources[0])
    }

    /// The bound resource. Defined only for single-node tasks.
    pub fn resource(&self) -> Result<Arc<NodeResource>> {
        self.single_resource().map(Arc::clone)
    }

    /// Snapshot of the cached node record. Defined only for single-node
    /// tasks.
    pub fn node(&self) -> Result<Node> {
        Ok(self.single_resource()?.node())
    }

    /// The bound driver instance. Defined only for single-node tasks.
    pub fn driver(&self) -> Result<Arc<dyn Driver>> {
        Ok(self.single_resource()?.driver())
    }

    /// Mutate the node record and persist it, refreshing the shared
    /// cache. Defined only for single-node tasks.
    ///
    /// The reservation column is never written through this path, so a
    /// stale cached record cannot clobber a lock.
    pub fn update_node<F>(&self, mutate: F) -> Result<Node>
    where
        F: FnOnce(&mut Node),
    {
        let resource = self.single_resource()?;
        let mut node = resource.node();
        mutate(&mut node);
        let stored = self.store.update_node(&node)?;
        resource.replace_node(stored.clone());
        Ok(stored)
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        for id in &self.node_ids {
            self.registry.release(*id, &self.owner);
        }

        if self.mode == LockMode::Exclusive {
            release_reservations(&self.store, &self.host, &self.node_ids);
        }

        debug!(owner = %self.owner, "Released task");
    }
}

/// Best-effort reservation release, one node at a time so one vanished
/// node cannot strand the others' locks.
fn release_reservations(store: &NodeStore, host: &str, node_ids: &[Uuid]) {
    for id in node_ids {
        match store.release_nodes(host, std::slice::from_ref(id)) {
            Ok(()) => {}
            Err(Error::NodeNotFound(_)) => {
                debug!(node_id = %id, "Node vanished before lock release");
            }
            Err(e) => {
                warn!(node_id = %id, error = %e, "Failed to release node reservation");
            }
        }
    }
}

/// Precondition for every state-mutating driver entry point: reject
/// calls made through a shared task before any driver code runs.
pub fn require_exclusive(task: &Task) -> Result<()> {
    if task.is_shared() {
        return Err(Error::ExclusiveLockRequired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{DriverFactory, FakeDriver};

    fn manager_with_nodes(count: usize) -> (Arc<NodeStore>, TaskManager, Vec<Uuid>) {
        let store = Arc::new(NodeStore::open_in_memory().unwrap());
        let ids: Vec<Uuid> = (0..count).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            store.create_node(&Node::new(*id, "fake")).unwrap();
        }

        let mut factory = DriverFactory::new();
        factory.register(Arc::new(FakeDriver::new()));
        let registry = Arc::new(ResourceRegistry::new(Arc::clone(&store), Arc::new(factory)));

        let manager = TaskManager::new(Arc::clone(&store), registry, "cond-1".to_string());
        (store, manager, ids)
    }

    #[test]
    fn test_exclusive_acquire_reserves() {
        let (store, manager, ids) = manager_with_nodes(1);

        let task = manager.acquire(&ids, LockMode::Exclusive, "test").unwrap();
        assert_eq!(
            store.get_node(ids[0]).unwrap().reservation.as_deref(),
            Some("cond-1")
        );

        drop(task);
        assert!(store.get_node(ids[0]).unwrap().reservation.is_none());
    }

    #[test]
    fn test_shared_acquire_takes_no_reservation() {
        let (store, manager, ids) = manager_with_nodes(1);

        let _one = manager.acquire(&ids, LockMode::Shared, "test").unwrap();
        let _two = manager.acquire(&ids, LockMode::Shared, "test").unwrap();
        assert!(store.get_node(ids[0]).unwrap().reservation.is_none());
    }

    #[test]
    fn test_exclusive_is_not_reentrant() {
        let (_store, manager, ids) = manager_with_nodes(1);

        let _held = manager.acquire(&ids, LockMode::Exclusive, "first").unwrap();
        let err = manager
            .acquire(&ids, LockMode::Exclusive, "second")
            .unwrap_err();
        assert!(matches!(err, Error::NodeLocked { .. }));
    }

    #[test]
    fn test_lock_elevation_from_shared() {
        let (store, manager, ids) = manager_with_nodes(1);

        let shared = manager.acquire(&ids, LockMode::Shared, "read").unwrap();
        // Fresh, independent exclusive acquisition alongside the shared
        // task succeeds while no exclusive holder exists.
        let exclusive = manager.acquire(&ids, LockMode::Exclusive, "write").unwrap();
        assert_eq!(
            store.get_node(ids[0]).unwrap().reservation.as_deref(),
            Some("cond-1")
        );

        drop(exclusive);
        drop(shared);
        assert!(store.get_node(ids[0]).unwrap().reservation.is_none());
    }

    #[test]
    fn test_upgrade_lock_in_place() {
        let (store, manager, ids) = manager_with_nodes(1);

        let mut task = manager.acquire(&ids, LockMode::Shared, "upgrade").unwrap();
        assert!(task.is_shared());

        task.upgrade_lock().unwrap();
        assert!(!task.is_shared());
        assert_eq!(
            store.get_node(ids[0]).unwrap().reservation.as_deref(),
            Some("cond-1")
        );

        drop(task);
        assert!(store.get_node(ids[0]).unwrap().reservation.is_none());
    }

    #[test]
    fn test_upgrade_lock_contended() {
        let (_store, manager, ids) = manager_with_nodes(1);

        let mut shared = manager.acquire(&ids, LockMode::Shared, "reader").unwrap();
        let _held = manager.acquire(&ids, LockMode::Exclusive, "writer").unwrap();

        let err = shared.upgrade_lock().unwrap_err();
        assert!(matches!(err, Error::NodeLocked { .. }));
        assert!(shared.is_shared());
    }

    #[test]
    fn test_multi_node_task_accessors_fail() {
        let (_store, manager, ids) = manager_with_nodes(2);

        let task = manager.acquire(&ids, LockMode::Exclusive, "multi").unwrap();
        assert!(matches!(task.node().unwrap_err(), Error::MultiNodeTask));
        assert!(matches!(task.driver().unwrap_err(), Error::MultiNodeTask));
        assert!(matches!(task.resource().unwrap_err(), Error::MultiNodeTask));
    }

    #[test]
    fn test_failed_acquire_rolls_back_reservations() {
        let (store, manager, ids) = manager_with_nodes(2);
        // Second id vanishes between listing and acquisition.
        store.destroy_node(ids[1]).unwrap();

        let err = manager
            .acquire(&ids, LockMode::Exclusive, "rollback")
            .unwrap_err();
        assert!(matches!(err, Error::NodeNotFound(_)));
        assert!(store.get_node(ids[0]).unwrap().reservation.is_none());
    }

    #[test]
    fn test_registry_binding_failure_rolls_back() {
        let store = Arc::new(NodeStore::open_in_memory().unwrap());
        let good = Uuid::new_v4();
        let bad = Uuid::new_v4();
        store.create_node(&Node::new(good, "fake")).unwrap();
        store.create_node(&Node::new(bad, "drac")).unwrap();

        let mut factory = DriverFactory::new();
        factory.register(Arc::new(FakeDriver::new()));
        let registry = Arc::new(ResourceRegistry::new(Arc::clone(&store), Arc::new(factory)));
        let manager = TaskManager::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            "cond-1".to_string(),
        );

        let err = manager
            .acquire(&[good, bad], LockMode::Exclusive, "bind")
            .unwrap_err();
        assert!(matches!(err, Error::DriverNotFound(_)));
        assert!(store.get_node(good).unwrap().reservation.is_none());
        assert_eq!(registry.holder_count(good), 0);
    }

    #[test]
    fn test_require_exclusive_guard() {
        let (_store, manager, ids) = manager_with_nodes(1);

        let shared = manager.acquire(&ids, LockMode::Shared, "guard").unwrap();
        assert!(matches!(
            require_exclusive(&shared).unwrap_err(),
            Error::ExclusiveLockRequired
        ));

        let exclusive = manager.acquire(&ids, LockMode::Exclusive, "guard").unwrap();
        require_exclusive(&exclusive).unwrap();
    }

    #[test]
    fn test_update_node_writes_through_cache() {
        let (store, manager, ids) = manager_with_nodes(1);

        let task = manager.acquire(&ids, LockMode::Exclusive, "write").unwrap();
        task.update_node(|node| node.last_error = Some("checked".to_string()))
            .unwrap();

        assert_eq!(task.node().unwrap().last_error.as_deref(), Some("checked"));
        assert_eq!(
            store.get_node(ids[0]).unwrap().last_error.as_deref(),
            Some("checked")
        );
    }

    #[test]
    fn test_shared_tasks_see_exclusive_writes() {
        let (_store, manager, ids) = manager_with_nodes(1);

        let shared = manager.acquire(&ids, LockMode::Shared, "reader").unwrap();
        let exclusive = manager.acquire(&ids, LockMode::Exclusive, "writer").unwrap();
        exclusive
            .update_node(|node| node.maintenance = true)
            .unwrap();

        // Same registry entry backs both tasks.
        assert!(shared.node().unwrap().maintenance);
    }
}
