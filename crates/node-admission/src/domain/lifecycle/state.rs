//! Per-workload lifecycle state machine
//!
//! ```text
//! Pending ──► Admitted ──► Running ──► Terminated | Failed
//!    │            │
//!    │            └──────────────────► Terminated | Failed
//!    └──► Rejected
//! ```
//!
//! Rejected, Terminated and Failed are terminal. Submitting the same
//! identifier again after a terminal phase creates a new instance.

use std::borrow::Borrow;
use std::fmt;

use api_types::DeviceGrants;
use api_types::ResourceRequest;
use api_types::WorkloadPhase;
use api_types::WorkloadStatus;

/// Opaque workload identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkloadId(String);

impl WorkloadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for WorkloadId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for WorkloadId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for WorkloadId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<&WorkloadId> for WorkloadId {
    fn from(id: &WorkloadId) -> Self {
        id.clone()
    }
}

/// Errors raised by illegal lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Workload {workload_id} cannot move from {from} to {to}")]
    InvalidTransition {
        workload_id: WorkloadId,
        from: WorkloadPhase,
        to: WorkloadPhase,
    },

    #[error("Workload not found: {workload_id}")]
    UnknownWorkload { workload_id: WorkloadId },
}

/// Whether the state machine allows `from -> to`
pub fn is_allowed(from: WorkloadPhase, to: WorkloadPhase) -> bool {
    use WorkloadPhase::*;

    matches!(
        (from, to),
        (Pending, Admitted)
            | (Pending, Rejected)
            | (Admitted, Running)
            | (Admitted, Terminated)
            | (Admitted, Failed)
            | (Running, Terminated)
            | (Running, Failed)
    )
}

/// One instance of a submitted workload
#[derive(Debug, Clone)]
pub struct WorkloadRecord {
    pub id: WorkloadId,
    pub instance: u64,
    pub request: ResourceRequest,
    pub phase: WorkloadPhase,
    /// Devices held while the instance is active
    pub devices: DeviceGrants,
    pub exhausted_classes: Vec<String>,
}

impl WorkloadRecord {
    /// A fresh instance in the Pending phase
    pub fn new(id: WorkloadId, instance: u64, request: ResourceRequest) -> Self {
        Self {
            id,
            instance,
            request,
            phase: WorkloadPhase::Pending,
            devices: DeviceGrants::new(),
            exhausted_classes: Vec::new(),
        }
    }

    /// Move to `to`, leaving the record untouched if the edge is not allowed.
    pub fn transition(&mut self, to: WorkloadPhase) -> Result<(), LifecycleError> {
        if !is_allowed(self.phase, to) {
            return Err(LifecycleError::InvalidTransition {
                workload_id: self.id.clone(),
                from: self.phase,
                to,
            });
        }

        self.phase = to;
        if to.is_terminal() {
            self.devices.clear();
        }
        Ok(())
    }

    pub fn status(&self) -> WorkloadStatus {
        WorkloadStatus {
            workload_id: self.id.to_string(),
            phase: self.phase,
            instance: self.instance,
            request: self.request.clone(),
            devices: self.devices.clone(),
            exhausted_classes: self.exhausted_classes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> WorkloadRecord {
        WorkloadRecord::new("default_gpus-success".into(), 1, ResourceRequest::new())
    }

    #[test]
    fn happy_path() {
        let mut record = record();
        record.transition(WorkloadPhase::Admitted).unwrap();
        record.transition(WorkloadPhase::Running).unwrap();
        record.transition(WorkloadPhase::Terminated).unwrap();
        assert_eq!(record.phase, WorkloadPhase::Terminated);
    }

    #[test]
    fn rejected_is_terminal() {
        let mut record = record();
        record.transition(WorkloadPhase::Rejected).unwrap();
        for to in [
            WorkloadPhase::Pending,
            WorkloadPhase::Admitted,
            WorkloadPhase::Running,
            WorkloadPhase::Terminated,
            WorkloadPhase::Failed,
        ] {
            let err = record.transition(to).unwrap_err();
            assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
            assert_eq!(record.phase, WorkloadPhase::Rejected);
        }
    }

    #[test]
    fn pending_cannot_run() {
        let mut record = record();
        assert!(record.transition(WorkloadPhase::Running).is_err());
        assert_eq!(record.phase, WorkloadPhase::Pending);
    }

    #[test]
    fn terminal_transition_drops_devices() {
        let mut record = record();
        record.transition(WorkloadPhase::Admitted).unwrap();
        record.devices.insert("gpu".to_string(), Vec::new());
        record.transition(WorkloadPhase::Failed).unwrap();
        assert!(record.devices.is_empty());
    }

    #[test]
    fn workload_id_borrows_as_str() {
        let mut map = std::collections::HashMap::new();
        map.insert(WorkloadId::new("a"), 1);
        assert_eq!(map.get("a"), Some(&1));
    }
}
