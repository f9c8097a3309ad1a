//! metalplane Conductor Library
//!
//! A conductor manages the lifecycle of physical machines ("nodes") on
//! behalf of many cooperating processes that share one persistent
//! store. At most one conductor holds the exclusive reservation on a
//! node at any instant; everything that mutates a node does so through
//! a scoped task holding that reservation.
//!
//! ## Architecture
//!
//! - **Node Store**: shared SQLite database; the reservation column is
//!   the system-wide exclusive lock, taken all-or-nothing across ids
//! - **Resource Registry**: per-node ref-counted binding of the cached
//!   record to its constructed driver instance, inside one process
//! - **Task Manager**: shared/exclusive scoped handles with rollback on
//!   partial acquisition, in-place upgrade and release-on-drop
//! - **Conductor Manager**: the provisioning/power state machine built
//!   on tasks, including the async hardware-job continuation sweep
//! - **Periodic Runner / Heartbeat**: background loops for power-state
//!   reconciliation, job polling and conductor liveness

pub mod db;
pub mod drivers;
pub mod manager;
pub mod resources;
pub mod task;

// Internal modules exposed for integration tests
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod periodic;

// Re-export commonly used types
pub use db::{Conductor, JsonMap, Node, NodeStore};
pub use drivers::{DriverFactory, FakeDriver};
pub use error::{Error, Result};
pub use manager::{ConductorManager, NodeUpdate};
pub use task::{LockMode, Task, TaskManager};
