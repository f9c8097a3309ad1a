//! Error types for the conductor core.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by conductor operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Node does not exist in the store.
    #[error("node {0} could not be found")]
    NodeNotFound(Uuid),

    /// Conductor row does not exist.
    #[error("conductor {0} could not be found")]
    ConductorNotFound(String),

    /// Reservation conflict: the node is already held.
    #[error("node {node} is locked by conductor {holder}")]
    NodeLocked { node: Uuid, holder: String },

    /// A state-mutating call was made through a shared task.
    #[error("an exclusive lock is required for this operation")]
    ExclusiveLockRequired,

    /// The node names a driver this process cannot resolve.
    #[error("driver {0} could not be resolved")]
    DriverNotFound(String),

    /// Bad driver_info or request payload.
    #[error("invalid parameter: {0}")]
    InvalidParameterValue(String),

    /// The node is associated with an instance.
    #[error("node {node} is associated with instance {instance}")]
    NodeAssociated { node: Uuid, instance: Uuid },

    /// Maintenance mode change rejected.
    #[error("maintenance mode change failed for node {node}: {reason}")]
    NodeMaintenanceFailure { node: Uuid, reason: String },

    /// Deploy or tear-down rejected or failed.
    #[error("deploy failure for node {node}: {reason}")]
    InstanceDeployFailure { node: Uuid, reason: String },

    /// The node's power state does not permit the operation.
    #[error("node {node} is in power state {state}, which does not permit this operation")]
    NodeInWrongPowerState { node: Uuid, state: String },

    /// Single-node accessor used on a multi-node task.
    #[error("operation not supported for multi-node tasks")]
    MultiNodeTask,

    /// Driver-reported hardware failure.
    #[error("driver operation failed: {0}")]
    DriverOperation(String),

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization of an opaque node map failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
