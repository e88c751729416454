//! Shared API type definitions
//!
//! This crate contains the serializable types exchanged between the admission
//! controller, its HTTP API and its clients: resource requests, admission
//! decisions, pool snapshots and workload status.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Requested units per resource class, e.g. `{"nvidia.com/gpu": 2}`
pub type ResourceRequest = BTreeMap<String, u64>;

/// Devices handed to a workload, keyed by resource class
pub type DeviceGrants = BTreeMap<String, Vec<DeviceGrant>>;

/// A single device unit reserved for a workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceGrant {
    /// Unit index inside its resource class
    pub index: u32,
    /// Stable device identifier (GPU UUID or device node name)
    pub id: String,
    /// Device node exposed to the workload, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_path: Option<PathBuf>,
}

/// Outcome of an admission request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AdmissionDecision {
    /// Every requested class was reserved
    Accepted { devices: DeviceGrants },
    /// At least one class could not be satisfied, nothing was reserved
    Rejected { exhausted_classes: Vec<String> },
}

impl AdmissionDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AdmissionDecision::Accepted { .. })
    }

    /// Classes that caused a rejection, empty for accepted decisions
    pub fn exhausted_classes(&self) -> &[String] {
        match self {
            AdmissionDecision::Accepted { .. } => &[],
            AdmissionDecision::Rejected { exhausted_classes } => exhausted_classes,
        }
    }
}

/// Lifecycle phase of a workload instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadPhase {
    Pending,
    Admitted,
    Running,
    Terminated,
    Failed,
    Rejected,
}

impl WorkloadPhase {
    /// Phases that hold (or may hold) reserved units
    pub fn is_active(self) -> bool {
        matches!(
            self,
            WorkloadPhase::Pending | WorkloadPhase::Admitted | WorkloadPhase::Running
        )
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

impl std::fmt::Display for WorkloadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Capacity of one resource class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCapacity {
    /// Resource class name
    pub class: String,
    /// Units discovered on the node
    pub total: u64,
    /// Units not held by any workload
    pub available: u64,
}

/// Point-in-time view of the node resource pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Classes sorted by name
    pub classes: Vec<ClassCapacity>,
}

impl PoolSnapshot {
    pub fn class(&self, class: &str) -> Option<&ClassCapacity> {
        self.classes.iter().find(|c| c.class == class)
    }
}

/// Current state of a workload as known by the admission controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadStatus {
    pub workload_id: String,
    pub phase: WorkloadPhase,
    /// Monotonic instance number, bumped on every resubmission
    pub instance: u64,
    pub request: ResourceRequest,
    /// Devices currently held by the workload
    pub devices: DeviceGrants,
    /// Classes that caused the rejection of this instance
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exhausted_classes: Vec<String>,
}

/// Body of an admission request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmitRequest {
    pub workload_id: String,
    #[serde(default)]
    pub request: ResourceRequest,
}

/// Result of releasing a workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseResult {
    pub workload_id: String,
    /// Units credited back to the pool by this call
    pub released_units: u64,
}

/// Common response envelope used by every API endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Payload (present when successful)
    pub data: Option<T>,
    /// Response message
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
        }
    }
}

pub type PoolResponse = ApiResponse<PoolSnapshot>;
pub type AdmitResponse = ApiResponse<AdmissionDecision>;
pub type WorkloadResponse = ApiResponse<WorkloadStatus>;
pub type ReleaseResponse = ApiResponse<ReleaseResult>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_is_tagged() {
        let decision = AdmissionDecision::Rejected {
            exhausted_classes: vec!["nvidia.com/gpu".to_string()],
        };
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["decision"], "rejected");
        assert_eq!(json["exhausted_classes"][0], "nvidia.com/gpu");
        assert!(!decision.is_accepted());
    }

    #[test]
    fn terminal_phases() {
        assert!(WorkloadPhase::Rejected.is_terminal());
        assert!(WorkloadPhase::Failed.is_terminal());
        assert!(WorkloadPhase::Terminated.is_terminal());
        assert!(WorkloadPhase::Running.is_active());
        assert!(WorkloadPhase::Admitted.is_active());
    }
}
