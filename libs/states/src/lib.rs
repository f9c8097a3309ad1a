//! Provisioning and power state vocabulary for metalplane.
//!
//! These types are shared between the conductor and anything that talks
//! to it. States are persisted as their `as_str` form; `from_str` is the
//! inverse. Driver operations report a tagged [`Outcome`] so callers can
//! distinguish work that finished synchronously from work that will only
//! complete after an external signal.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a node's operating-system deployment workflow.
///
/// Serde names match the `as_str` form so the wire and the store agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProvisionState {
    /// Node has been enrolled but not yet verified.
    #[serde(rename = "enroll")]
    Enroll,
    /// Node is verified and can be moved into the deployable pool.
    #[serde(rename = "manageable")]
    Manageable,
    /// Node is ready for deployment.
    #[serde(rename = "available")]
    Available,
    /// No provisioning operation is pending or the node predates the
    /// available pool. Also used as the empty target.
    #[serde(rename = "nostate")]
    NoState,
    /// Deployment is actively running.
    #[serde(rename = "deploying")]
    Deploying,
    /// Deployment is waiting for an external callback.
    #[serde(rename = "deploy wait")]
    DeployWait,
    /// Deployment completed; the instance is live.
    #[serde(rename = "active")]
    Active,
    /// Deployment failed.
    #[serde(rename = "deploy failed")]
    DeployFail,
    /// Cleaning is actively running.
    #[serde(rename = "cleaning")]
    Cleaning,
    /// Cleaning is waiting for an external signal.
    #[serde(rename = "clean wait")]
    CleanWait,
    /// Rescue is actively running.
    #[serde(rename = "rescuing")]
    Rescuing,
    /// Rescue is waiting for an external signal.
    #[serde(rename = "rescue wait")]
    RescueWait,
    /// Node is in rescue mode.
    #[serde(rename = "rescue")]
    Rescue,
    /// Servicing is actively running.
    #[serde(rename = "servicing")]
    Servicing,
    /// Servicing is waiting for an external signal.
    #[serde(rename = "service wait")]
    ServiceWait,
    /// Inspection is actively running.
    #[serde(rename = "inspecting")]
    Inspecting,
    /// Inspection is waiting for an external signal.
    #[serde(rename = "inspect wait")]
    InspectWait,
    /// Tear-down is actively running.
    #[serde(rename = "deleting")]
    Deleting,
    /// Tear-down finished; transient state before the node returns to
    /// the pool.
    #[serde(rename = "deleted")]
    Deleted,
    /// An operation failed outside the deploy path.
    #[serde(rename = "error")]
    Error,
}

impl ProvisionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enroll => "enroll",
            Self::Manageable => "manageable",
            Self::Available => "available",
            Self::NoState => "nostate",
            Self::Deploying => "deploying",
            Self::DeployWait => "deploy wait",
            Self::Active => "active",
            Self::DeployFail => "deploy failed",
            Self::Cleaning => "cleaning",
            Self::CleanWait => "clean wait",
            Self::Rescuing => "rescuing",
            Self::RescueWait => "rescue wait",
            Self::Rescue => "rescue",
            Self::Servicing => "servicing",
            Self::ServiceWait => "service wait",
            Self::Inspecting => "inspecting",
            Self::InspectWait => "inspect wait",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
            Self::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "enroll" => Some(Self::Enroll),
            "manageable" => Some(Self::Manageable),
            "available" => Some(Self::Available),
            "nostate" => Some(Self::NoState),
            "deploying" => Some(Self::Deploying),
            "deploy wait" => Some(Self::DeployWait),
            "active" => Some(Self::Active),
            "deploy failed" => Some(Self::DeployFail),
            "cleaning" => Some(Self::Cleaning),
            "clean wait" => Some(Self::CleanWait),
            "rescuing" => Some(Self::Rescuing),
            "rescue wait" => Some(Self::RescueWait),
            "rescue" => Some(Self::Rescue),
            "servicing" => Some(Self::Servicing),
            "service wait" => Some(Self::ServiceWait),
            "inspecting" => Some(Self::Inspecting),
            "inspect wait" => Some(Self::InspectWait),
            "deleting" => Some(Self::Deleting),
            "deleted" => Some(Self::Deleted),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// True while a provisioning operation is underway, either actively
    /// or waiting on an external signal.
    pub fn in_transition(&self) -> bool {
        matches!(
            self,
            Self::Deploying
                | Self::DeployWait
                | Self::Cleaning
                | Self::CleanWait
                | Self::Rescuing
                | Self::RescueWait
                | Self::Servicing
                | Self::ServiceWait
                | Self::Inspecting
                | Self::InspectWait
                | Self::Deleting
        )
    }

    /// The active working state an operation passes through on its way
    /// to `goal`.
    pub fn step_toward(goal: ProvisionState) -> ProvisionState {
        match goal {
            Self::Active => Self::Deploying,
            Self::NoState | Self::Available => Self::Deleting,
            Self::Manageable => Self::Cleaning,
            Self::Rescue => Self::Rescuing,
            other => other,
        }
    }

    /// The failure state matching an in-progress state.
    pub fn failure_state(&self) -> ProvisionState {
        match self {
            Self::Deploying | Self::DeployWait => Self::DeployFail,
            _ => Self::Error,
        }
    }
}

impl std::fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Power state as reported by or requested from a node's management
/// controller.
///
/// `Reboot` is only ever a request target; drivers report the result as
/// `PowerOn` and the record never stores it as a current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerState {
    #[serde(rename = "power on")]
    PowerOn,
    #[serde(rename = "power off")]
    PowerOff,
    #[serde(rename = "rebooting")]
    Reboot,
}

impl PowerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PowerOn => "power on",
            Self::PowerOff => "power off",
            Self::Reboot => "rebooting",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "power on" => Some(Self::PowerOn),
            "power off" => Some(Self::PowerOff),
            "rebooting" => Some(Self::Reboot),
            _ => None,
        }
    }

    /// The state a node settles in once this request succeeds.
    pub fn resolved(&self) -> PowerState {
        match self {
            Self::Reboot => Self::PowerOn,
            other => *other,
        }
    }
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a driver operation that may complete asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The operation finished; the node is in the given state.
    Completed(ProvisionState),
    /// The operation started; the node will eventually reach the given
    /// state once the pending hardware work finishes.
    InProgress(ProvisionState),
}
