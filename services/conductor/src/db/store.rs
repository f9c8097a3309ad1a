//! SQLite-backed node and conductor store.
//!
//! All conductors share one database file (WAL mode); SQLite serialises
//! writers, which is what makes the multi-node reservation transaction
//! all-or-nothing under concurrent acquisition attempts.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use metalplane_states::{PowerState, ProvisionState};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Opaque configuration/bookkeeping map carried on a node record.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// A node record.
#[derive(Debug, Clone)]
pub struct Node {
    /// Immutable identity.
    pub uuid: Uuid,
    /// Current lifecycle phase.
    pub provision_state: ProvisionState,
    /// Goal of the pending provisioning operation; `NoState` when none.
    pub target_provision_state: ProvisionState,
    /// Last observed power state, if any reading has been taken.
    pub power_state: Option<PowerState>,
    /// Requested power state of an in-flight power operation.
    pub target_power_state: Option<PowerState>,
    /// Message from the most recent failed operation.
    pub last_error: Option<String>,
    /// Hostname of the conductor holding the exclusive lock, if any.
    pub reservation: Option<String>,
    /// Maintenance flag; maintained nodes are skipped by sweeps.
    pub maintenance: bool,
    /// Name of the hardware driver managing this node.
    pub driver: String,
    /// Driver configuration, validated by the driver itself.
    pub driver_info: JsonMap,
    /// Driver working state used for cross-step bookkeeping
    /// (e.g. pending hardware job ids).
    pub driver_internal_info: JsonMap,
    /// Consumer association, if the node carries an instance.
    pub instance_uuid: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// A freshly enrolled node with no pending operations.
    pub fn new(uuid: Uuid, driver: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uuid,
            provision_state: ProvisionState::Enroll,
            target_provision_state: ProvisionState::NoState,
            power_state: None,
            target_power_state: None,
            last_error: None,
            reservation: None,
            maintenance: false,
            driver: driver.into(),
            driver_info: JsonMap::new(),
            driver_internal_info: JsonMap::new(),
            instance_uuid: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A conductor registration row.
#[derive(Debug, Clone)]
pub struct Conductor {
    /// Process identity; also the reservation holder string.
    pub hostname: String,
    /// Driver names this conductor can service.
    pub drivers: Vec<String>,
    pub registered_at: DateTime<Utc>,
    /// Refreshed by the heartbeat loop; liveness is judged against this.
    pub updated_at: DateTime<Utc>,
}

/// SQLite node and conductor store.
pub struct NodeStore {
    conn: Mutex<Connection>,
}

impl NodeStore {
    /// Open or create the shared store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode so readers do not block the writer
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn init_schema(&self) -> Result<()> {
        self.conn().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                uuid TEXT PRIMARY KEY,
                provision_state TEXT NOT NULL,
                target_provision_state TEXT NOT NULL,
                power_state TEXT,
                target_power_state TEXT,
                last_error TEXT,
                reservation TEXT,
                maintenance INTEGER NOT NULL DEFAULT 0,
                driver TEXT NOT NULL,
                driver_info TEXT NOT NULL DEFAULT '{}',
                driver_internal_info TEXT NOT NULL DEFAULT '{}',
                instance_uuid TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_nodes_reservation ON nodes(reservation);

            CREATE TABLE IF NOT EXISTS conductors (
                hostname TEXT PRIMARY KEY,
                drivers TEXT NOT NULL DEFAULT '[]',
                registered_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        debug!("Node store schema initialized");
        Ok(())
    }

    // -------------------------------------------------------------------
    // Nodes
    // -------------------------------------------------------------------

    /// Insert a new node record.
    pub fn create_node(&self, node: &Node) -> Result<()> {
        let result = self.conn().execute(
            r#"
            INSERT INTO nodes (
                uuid, provision_state, target_provision_state, power_state,
                target_power_state, last_error, reservation, maintenance,
                driver, driver_info, driver_internal_info, instance_uuid,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                node.uuid.to_string(),
                node.provision_state.as_str(),
                node.target_provision_state.as_str(),
                node.power_state.map(|s| s.as_str()),
                node.target_power_state.map(|s| s.as_str()),
                node.last_error,
                node.reservation,
                node.maintenance,
                node.driver,
                serde_json::to_string(&node.driver_info)?,
                serde_json::to_string(&node.driver_internal_info)?,
                node.instance_uuid.map(|u| u.to_string()),
                timestamp(node.created_at),
                timestamp(node.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::InvalidParameterValue(format!(
                    "node {} already exists",
                    node.uuid
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch a node by id.
    pub fn get_node(&self, uuid: Uuid) -> Result<Node> {
        self.conn()
            .query_row(
                &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE uuid = ?1"),
                params![uuid.to_string()],
                node_from_row,
            )
            .optional()?
            .ok_or(Error::NodeNotFound(uuid))
    }

    /// List all nodes.
    pub fn list_nodes(&self) -> Result<Vec<Node>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {NODE_COLUMNS} FROM nodes ORDER BY created_at"))?;
        let nodes = stmt
            .query_map([], node_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(nodes)
    }

    /// List nodes eligible for the power-state sweep: neither reserved
    /// nor in maintenance.
    pub fn list_nodes_for_power_sync(&self) -> Result<Vec<Node>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes
             WHERE reservation IS NULL AND maintenance = 0
             ORDER BY created_at"
        ))?;
        let nodes = stmt
            .query_map([], node_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(nodes)
    }

    /// Persist every mutable field of a node record except its
    /// reservation, which only moves through [`NodeStore::reserve_nodes`]
    /// and [`NodeStore::release_nodes`]. Returns the stored row.
    pub fn update_node(&self, node: &Node) -> Result<Node> {
        let updated = {
            let conn = self.conn();
            conn.execute(
                r#"
                UPDATE nodes SET
                    provision_state = ?1,
                    target_provision_state = ?2,
                    power_state = ?3,
                    target_power_state = ?4,
                    last_error = ?5,
                    maintenance = ?6,
                    driver = ?7,
                    driver_info = ?8,
                    driver_internal_info = ?9,
                    instance_uuid = ?10,
                    updated_at = ?11
                WHERE uuid = ?12
                "#,
                params![
                    node.provision_state.as_str(),
                    node.target_provision_state.as_str(),
                    node.power_state.map(|s| s.as_str()),
                    node.target_power_state.map(|s| s.as_str()),
                    node.last_error,
                    node.maintenance,
                    node.driver,
                    serde_json::to_string(&node.driver_info)?,
                    serde_json::to_string(&node.driver_internal_info)?,
                    node.instance_uuid.map(|u| u.to_string()),
                    now(),
                    node.uuid.to_string(),
                ],
            )?
        };

        if updated == 0 {
            return Err(Error::NodeNotFound(node.uuid));
        }
        self.get_node(node.uuid)
    }

    /// Delete a node record.
    pub fn destroy_node(&self, uuid: Uuid) -> Result<()> {
        let deleted = self
            .conn()
            .execute("DELETE FROM nodes WHERE uuid = ?1", params![uuid.to_string()])?;
        if deleted == 0 {
            return Err(Error::NodeNotFound(uuid));
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Reservations
    // -------------------------------------------------------------------

    /// Reserve every listed node for `holder` as one atomic unit.
    ///
    /// Fails with `NodeNotFound` if any listed node does not exist and
    /// with `NodeLocked` if any listed node carries a reservation
    /// (including one held by `holder` itself: exclusive locks are not
    /// reentrant). No partial reservation survives a failed call.
    pub fn reserve_nodes(&self, holder: &str, ids: &[Uuid]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        for id in ids {
            let current: Option<Option<String>> = tx
                .query_row(
                    "SELECT reservation FROM nodes WHERE uuid = ?1",
                    params![id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;

            match current {
                None => return Err(Error::NodeNotFound(*id)),
                Some(Some(existing)) => {
                    return Err(Error::NodeLocked {
                        node: *id,
                        holder: existing,
                    })
                }
                Some(None) => {}
            }
        }

        for id in ids {
            tx.execute(
                "UPDATE nodes SET reservation = ?1, updated_at = ?2 WHERE uuid = ?3",
                params![holder, now(), id.to_string()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Clear the reservation on every listed node held by `holder`.
    ///
    /// Fails with `NodeLocked` if any listed node is held by a different
    /// holder (nothing is released in that case) and `NodeNotFound` if a
    /// node no longer exists. A listed node with no reservation is
    /// treated as already released.
    pub fn release_nodes(&self, holder: &str, ids: &[Uuid]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        for id in ids {
            let current: Option<Option<String>> = tx
                .query_row(
                    "SELECT reservation FROM nodes WHERE uuid = ?1",
                    params![id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;

            match current {
                None => return Err(Error::NodeNotFound(*id)),
                Some(Some(existing)) if existing != holder => {
                    return Err(Error::NodeLocked {
                        node: *id,
                        holder: existing,
                    })
                }
                _ => {}
            }
        }

        for id in ids {
            tx.execute(
                "UPDATE nodes SET reservation = NULL, updated_at = ?1
                 WHERE uuid = ?2 AND reservation = ?3",
                params![now(), id.to_string(), holder],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Conductors
    // -------------------------------------------------------------------

    /// Register a conductor, refreshing its driver list if it already
    /// exists.
    pub fn register_conductor(&self, hostname: &str, drivers: &[String]) -> Result<Conductor> {
        self.conn().execute(
            r#"
            INSERT INTO conductors (hostname, drivers, registered_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(hostname) DO UPDATE SET
                drivers = excluded.drivers,
                updated_at = excluded.updated_at
            "#,
            params![hostname, serde_json::to_string(drivers)?, now()],
        )?;
        self.get_conductor(hostname)
    }

    /// Refresh a conductor's heartbeat timestamp.
    pub fn touch_conductor(&self, hostname: &str) -> Result<()> {
        let updated = self.conn().execute(
            "UPDATE conductors SET updated_at = ?1 WHERE hostname = ?2",
            params![now(), hostname],
        )?;
        if updated == 0 {
            return Err(Error::ConductorNotFound(hostname.to_string()));
        }
        Ok(())
    }

    /// Fetch a conductor registration.
    pub fn get_conductor(&self, hostname: &str) -> Result<Conductor> {
        self.conn()
            .query_row(
                "SELECT hostname, drivers, registered_at, updated_at
                 FROM conductors WHERE hostname = ?1",
                params![hostname],
                conductor_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::ConductorNotFound(hostname.to_string()))
    }

    /// Remove a conductor registration.
    pub fn unregister_conductor(&self, hostname: &str) -> Result<()> {
        let deleted = self.conn().execute(
            "DELETE FROM conductors WHERE hostname = ?1",
            params![hostname],
        )?;
        if deleted == 0 {
            return Err(Error::ConductorNotFound(hostname.to_string()));
        }
        Ok(())
    }

    /// Driver names servable fleet-wide: the union of driver lists over
    /// conductors that have heartbeated within `window`.
    pub fn active_driver_names(&self, window: Duration) -> Result<BTreeSet<String>> {
        let cutoff = timestamp(
            Utc::now() - chrono::Duration::from_std(window).unwrap_or(chrono::Duration::zero()),
        );

        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT drivers FROM conductors WHERE updated_at >= ?1")?;
        let lists = stmt
            .query_map(params![cutoff], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut names = BTreeSet::new();
        for list in lists {
            let drivers: Vec<String> = serde_json::from_str(&list).unwrap_or_default();
            names.extend(drivers);
        }
        Ok(names)
    }
}

const NODE_COLUMNS: &str = "uuid, provision_state, target_provision_state, power_state, \
     target_power_state, last_error, reservation, maintenance, driver, \
     driver_info, driver_internal_info, instance_uuid, created_at, updated_at";

/// Fixed-width UTC timestamps so lexicographic comparison in SQL matches
/// chronological order.
fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn now() -> String {
    timestamp(Utc::now())
}

fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn node_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Node> {
    let uuid_str: String = row.get(0)?;
    let uuid = Uuid::parse_str(&uuid_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let provision: String = row.get(1)?;
    let target_provision: String = row.get(2)?;
    let power: Option<String> = row.get(3)?;
    let target_power: Option<String> = row.get(4)?;
    let driver_info: String = row.get(9)?;
    let driver_internal_info: String = row.get(10)?;
    let instance_uuid: Option<String> = row.get(11)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;

    Ok(Node {
        uuid,
        provision_state: ProvisionState::from_str(&provision).unwrap_or(ProvisionState::Error),
        target_provision_state: ProvisionState::from_str(&target_provision)
            .unwrap_or(ProvisionState::NoState),
        power_state: power.as_deref().and_then(PowerState::from_str),
        target_power_state: target_power.as_deref().and_then(PowerState::from_str),
        last_error: row.get(5)?,
        reservation: row.get(6)?,
        maintenance: row.get(7)?,
        driver: row.get(8)?,
        driver_info: serde_json::from_str(&driver_info).unwrap_or_default(),
        driver_internal_info: serde_json::from_str(&driver_internal_info).unwrap_or_default(),
        instance_uuid: instance_uuid.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
        created_at: parse_timestamp(12, &created_at)?,
        updated_at: parse_timestamp(13, &updated_at)?,
    })
}

fn conductor_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conductor> {
    let drivers: String = row.get(1)?;
    let registered_at: String = row.get(2)?;
    let updated_at: String = row.get(3)?;

    Ok(Conductor {
        hostname: row.get(0)?,
        drivers: serde_json::from_str(&drivers).unwrap_or_default(),
        registered_at: parse_timestamp(2, &registered_at)?,
        updated_at: parse_timestamp(3, &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_nodes(count: usize) -> (NodeStore, Vec<Uuid>) {
        let store = NodeStore::open_in_memory().unwrap();
        let ids: Vec<Uuid> = (0..count).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            store.create_node(&Node::new(*id, "fake")).unwrap();
        }
        (store, ids)
    }

    #[test]
    fn test_create_and_get_node() {
        let store = NodeStore::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        store.create_node(&Node::new(id, "fake")).unwrap();

        let node = store.get_node(id).unwrap();
        assert_eq!(node.uuid, id);
        assert_eq!(node.provision_state, ProvisionState::Enroll);
        assert_eq!(node.target_provision_state, ProvisionState::NoState);
        assert!(node.reservation.is_none());
        assert!(!node.maintenance);
    }

    #[test]
    fn test_create_duplicate_node() {
        let store = NodeStore::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        store.create_node(&Node::new(id, "fake")).unwrap();

        let err = store.create_node(&Node::new(id, "fake")).unwrap_err();
        assert!(matches!(err, Error::InvalidParameterValue(_)));
    }

    #[test]
    fn test_get_missing_node() {
        let store = NodeStore::open_in_memory().unwrap();
        let err = store.get_node(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::NodeNotFound(_)));
    }

    #[test]
    fn test_update_node_roundtrips_maps() {
        let (store, ids) = store_with_nodes(1);
        let mut node = store.get_node(ids[0]).unwrap();
        node.provision_state = ProvisionState::Available;
        node.driver_info
            .insert("address".to_string(), serde_json::json!("10.0.0.5"));
        node.driver_internal_info
            .insert("raid_job_ids".to_string(), serde_json::json!(["JID_1"]));

        let stored = store.update_node(&node).unwrap();
        assert_eq!(stored.provision_state, ProvisionState::Available);
        assert_eq!(stored.driver_info["address"], serde_json::json!("10.0.0.5"));
        assert_eq!(
            stored.driver_internal_info["raid_job_ids"],
            serde_json::json!(["JID_1"])
        );
    }

    #[test]
    fn test_update_node_does_not_touch_reservation() {
        let (store, ids) = store_with_nodes(1);
        store.reserve_nodes("cond-1", &ids).unwrap();

        // A stale in-memory record with no reservation must not clobber
        // the lock when written back.
        let mut node = store.get_node(ids[0]).unwrap();
        node.reservation = None;
        node.last_error = Some("boom".to_string());
        store.update_node(&node).unwrap();

        let stored = store.get_node(ids[0]).unwrap();
        assert_eq!(stored.reservation.as_deref(), Some("cond-1"));
        assert_eq!(stored.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_reserve_and_release() {
        let (store, ids) = store_with_nodes(2);

        store.reserve_nodes("cond-1", &ids).unwrap();
        for id in &ids {
            assert_eq!(
                store.get_node(*id).unwrap().reservation.as_deref(),
                Some("cond-1")
            );
        }

        store.release_nodes("cond-1", &ids).unwrap();
        for id in &ids {
            assert!(store.get_node(*id).unwrap().reservation.is_none());
        }
    }

    #[test]
    fn test_reserve_conflict_is_all_or_nothing() {
        let (store, ids) = store_with_nodes(3);
        store.reserve_nodes("cond-1", &ids[..1]).unwrap();

        // Overlapping set: nothing in it may be reserved.
        let err = store.reserve_nodes("cond-2", &ids).unwrap_err();
        assert!(matches!(err, Error::NodeLocked { .. }));
        assert_eq!(
            store.get_node(ids[0]).unwrap().reservation.as_deref(),
            Some("cond-1")
        );
        assert!(store.get_node(ids[1]).unwrap().reservation.is_none());
        assert!(store.get_node(ids[2]).unwrap().reservation.is_none());

        // Disjoint set still works.
        store.reserve_nodes("cond-2", &ids[1..]).unwrap();
    }

    #[test]
    fn test_reserve_missing_node_reserves_nothing() {
        let (store, mut ids) = store_with_nodes(2);
        ids.push(Uuid::new_v4());

        let err = store.reserve_nodes("cond-1", &ids).unwrap_err();
        assert!(matches!(err, Error::NodeNotFound(_)));
        assert!(store.get_node(ids[0]).unwrap().reservation.is_none());
        assert!(store.get_node(ids[1]).unwrap().reservation.is_none());
    }

    #[test]
    fn test_reserve_is_not_reentrant() {
        let (store, ids) = store_with_nodes(1);
        store.reserve_nodes("cond-1", &ids).unwrap();

        let err = store.reserve_nodes("cond-1", &ids).unwrap_err();
        assert!(matches!(err, Error::NodeLocked { .. }));
    }

    #[test]
    fn test_release_by_non_holder() {
        let (store, ids) = store_with_nodes(1);
        store.reserve_nodes("cond-1", &ids).unwrap();

        let err = store.release_nodes("cond-2", &ids).unwrap_err();
        assert!(matches!(err, Error::NodeLocked { .. }));
        assert_eq!(
            store.get_node(ids[0]).unwrap().reservation.as_deref(),
            Some("cond-1")
        );

        // After a correct release a different holder can reserve at once.
        store.release_nodes("cond-1", &ids).unwrap();
        store.reserve_nodes("cond-2", &ids).unwrap();
    }

    #[test]
    fn test_release_unreserved_is_noop() {
        let (store, ids) = store_with_nodes(1);
        store.release_nodes("cond-1", &ids).unwrap();
    }

    #[test]
    fn test_power_sync_listing_skips_reserved_and_maintenance() {
        let (store, ids) = store_with_nodes(3);
        store.reserve_nodes("cond-1", &ids[..1]).unwrap();

        let mut maintained = store.get_node(ids[1]).unwrap();
        maintained.maintenance = true;
        store.update_node(&maintained).unwrap();

        let eligible = store.list_nodes_for_power_sync().unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].uuid, ids[2]);
    }

    #[test]
    fn test_destroy_node() {
        let (store, ids) = store_with_nodes(1);
        store.destroy_node(ids[0]).unwrap();
        assert!(matches!(
            store.get_node(ids[0]).unwrap_err(),
            Error::NodeNotFound(_)
        ));
        assert!(matches!(
            store.destroy_node(ids[0]).unwrap_err(),
            Error::NodeNotFound(_)
        ));
    }

    #[test]
    fn test_conductor_registration_and_liveness() {
        let store = NodeStore::open_in_memory().unwrap();
        store
            .register_conductor("cond-1", &["fake".to_string(), "ipmi".to_string()])
            .unwrap();
        store
            .register_conductor("cond-2", &["fake".to_string()])
            .unwrap();

        let cond = store.get_conductor("cond-1").unwrap();
        assert_eq!(cond.drivers, vec!["fake".to_string(), "ipmi".to_string()]);

        let names = store.active_driver_names(Duration::from_secs(60)).unwrap();
        assert!(names.contains("fake"));
        assert!(names.contains("ipmi"));

        store.touch_conductor("cond-1").unwrap();
        assert!(matches!(
            store.touch_conductor("cond-3").unwrap_err(),
            Error::ConductorNotFound(_)
        ));

        store.unregister_conductor("cond-2").unwrap();
        assert!(matches!(
            store.get_conductor("cond-2").unwrap_err(),
            Error::ConductorNotFound(_)
        ));
    }
}
