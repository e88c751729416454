//! Lifecycle notifications from the workload runtime

use api_types::AdmissionDecision;
use api_types::ResourceRequest;
use tracing::debug;

use super::state::WorkloadId;
use crate::domain::admission::AdmissionController;
use crate::domain::admission::AdmissionError;

/// Events a workload runtime reports about its workloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadEvent {
    /// A workload asks to be admitted
    Submitted {
        workload_id: WorkloadId,
        request: ResourceRequest,
    },
    /// An admitted workload started running
    Started { workload_id: WorkloadId },
    /// A workload exited; its units can be reclaimed
    Terminated { workload_id: WorkloadId, failed: bool },
    /// The runtime no longer knows the workload
    Removed { workload_id: WorkloadId },
}

impl WorkloadEvent {
    pub fn workload_id(&self) -> &WorkloadId {
        match self {
            WorkloadEvent::Submitted { workload_id, .. }
            | WorkloadEvent::Started { workload_id }
            | WorkloadEvent::Terminated { workload_id, .. }
            | WorkloadEvent::Removed { workload_id } => workload_id,
        }
    }
}

/// What applying an event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Decided(AdmissionDecision),
    Started,
    Released { units: u64 },
}

/// Receiver of workload lifecycle events.
///
/// Runtime integrations push events here; termination and removal must
/// release whatever the workload holds.
pub trait LifecycleObserver: Send + Sync {
    /// Apply one event.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError`] if the event is not valid for the workload's current state
    fn observe(&self, event: WorkloadEvent) -> Result<EventOutcome, AdmissionError>;
}

impl LifecycleObserver for AdmissionController {
    fn observe(&self, event: WorkloadEvent) -> Result<EventOutcome, AdmissionError> {
        debug!(event = ?event, "Observed workload event");

        match event {
            WorkloadEvent::Submitted {
                workload_id,
                request,
            } => self.admit(workload_id, &request).map(EventOutcome::Decided),
            WorkloadEvent::Started { workload_id } => self
                .mark_running(workload_id.as_str())
                .map(|()| EventOutcome::Started),
            WorkloadEvent::Terminated {
                workload_id,
                failed,
            } => self
                .mark_terminated(workload_id.as_str(), failed)
                .map(|units| EventOutcome::Released { units }),
            WorkloadEvent::Removed { workload_id } => self
                .forget(workload_id.as_str())
                .map(|units| EventOutcome::Released { units }),
        }
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::domain::pool::ClassInventory;
    use crate::domain::pool::ResourcePool;

    #[test]
    fn events_drive_the_exclusivity_scenario() {
        let pool =
            ResourcePool::from_inventory(vec![ClassInventory::with_count("gpu", 1)]).unwrap();
        let controller = AdmissionController::new(pool);
        let request = ResourceRequest::from([("gpu".to_string(), 1)]);

        let submit = |id: &str| WorkloadEvent::Submitted {
            workload_id: id.into(),
            request: request.clone(),
        };

        let outcome = controller.observe(submit("success")).unwrap();
        assert!(matches!(outcome, EventOutcome::Decided(d) if d.is_accepted()));
        controller
            .observe(WorkloadEvent::Started {
                workload_id: "success".into(),
            })
            .unwrap();

        let outcome = controller.observe(submit("failure")).unwrap();
        assert!(matches!(outcome, EventOutcome::Decided(d) if !d.is_accepted()));

        let outcome = controller
            .observe(WorkloadEvent::Removed {
                workload_id: "success".into(),
            })
            .unwrap();
        assert_eq!(outcome, EventOutcome::Released { units: 1 });

        controller
            .observe(WorkloadEvent::Removed {
                workload_id: "failure".into(),
            })
            .unwrap();
        let outcome = controller.observe(submit("failure")).unwrap();
        assert!(matches!(outcome, EventOutcome::Decided(d) if d.is_accepted()));
        assert_eq!(controller.available("gpu"), 0);
    }

    #[test]
    fn workload_id_accessor() {
        let event = WorkloadEvent::Terminated {
            workload_id: "w".into(),
            failed: true,
        };
        assert_eq!(event.workload_id().as_str(), "w");
    }
}
