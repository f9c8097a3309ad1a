//! Per-node resource registry.
//!
//! One live entry per node inside a process, shared by every task
//! currently bound to that node: the cached node record plus the
//! constructed driver instance. Entries are reference-counted by holder
//! and discarded when the last holder releases.
//!
//! Registry bookkeeping is serialised by one coarse lock, distinct from
//! per-node reservations; the expensive hardware operations happen
//! outside it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::debug;
use uuid::Uuid;

use crate::db::{Node, NodeStore};
use crate::drivers::{Driver, DriverFactory};
use crate::error::Result;

/// A node's cached record and bound driver, shared by concurrent tasks.
#[derive(Debug)]
pub struct NodeResource {
    node: RwLock<Node>,
    driver: Arc<dyn Driver>,
}

impl NodeResource {
    fn new(node: Node, driver: Arc<dyn Driver>) -> Self {
        Self {
            node: RwLock::new(node),
            driver,
        }
    }

    /// Snapshot of the cached node record.
    pub fn node(&self) -> Node {
        self.node
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The driver instance bound to this node.
    pub fn driver(&self) -> Arc<dyn Driver> {
        Arc::clone(&self.driver)
    }

    pub(crate) fn replace_node(&self, node: Node) {
        *self
            .node
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = node;
    }
}

struct Slot {
    resource: Arc<NodeResource>,
    holders: Vec<String>,
}

/// Registry of live node resources, keyed by node id.
pub struct ResourceRegistry {
    store: Arc<NodeStore>,
    factory: Arc<DriverFactory>,
    slots: Mutex<HashMap<Uuid, Slot>>,
}

impl ResourceRegistry {
    pub fn new(store: Arc<NodeStore>, factory: Arc<DriverFactory>) -> Self {
        Self {
            store,
            factory,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<Uuid, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Bind `owner` to the node's resource, creating it on first use.
    ///
    /// Fails with `NodeNotFound` if the record does not exist and
    /// `DriverNotFound` if the node names a driver this process cannot
    /// resolve; a failed acquire leaves no trace in the registry.
    pub fn acquire(&self, id: Uuid, owner: &str) -> Result<Arc<NodeResource>> {
        let mut slots = self.lock_slots();

        if let Some(slot) = slots.get_mut(&id) {
            slot.holders.push(owner.to_string());
            return Ok(Arc::clone(&slot.resource));
        }

        let node = self.store.get_node(id)?;
        let driver = self.factory.resolve(&node.driver)?;
        let resource = Arc::new(NodeResource::new(node, driver));
        slots.insert(
            id,
            Slot {
                resource: Arc::clone(&resource),
                holders: vec![owner.to_string()],
            },
        );

        debug!(node_id = %id, "Created node resource entry");
        Ok(resource)
    }

    /// Drop `owner`'s hold; the entry is discarded with its driver
    /// binding once the holder list empties.
    pub fn release(&self, id: Uuid, owner: &str) {
        let mut slots = self.lock_slots();

        if let Some(slot) = slots.get_mut(&id) {
            if let Some(pos) = slot.holders.iter().position(|h| h == owner) {
                slot.holders.remove(pos);
            }
            if slot.holders.is_empty() {
                slots.remove(&id);
                debug!(node_id = %id, "Discarded node resource entry");
            }
        }
    }

    /// Number of holders currently bound to a node's entry.
    pub fn holder_count(&self, id: Uuid) -> usize {
        self.lock_slots()
            .get(&id)
            .map(|slot| slot.holders.len())
            .unwrap_or(0)
    }
}
