//! Shared state persistence for the conductor.
//!
//! This module provides SQLite-based storage for:
//! - Node records (provision/power state, reservation, driver bindings)
//! - Conductor registrations (hostname, supported drivers, heartbeat)
//!
//! The database file is the single authoritative store shared by every
//! conductor process; the reservation column on the nodes table is the
//! system-wide exclusive lock.

mod store;

pub use store::{Conductor, JsonMap, Node, NodeStore};
