use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use api_types::AdmissionDecision;
use api_types::ResourceRequest;
use api_types::WorkloadPhase;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::types::PodRef;
use super::types::PodUpdate;
use crate::domain::admission::AdmissionController;
use crate::domain::lifecycle::EventOutcome;
use crate::domain::lifecycle::LifecycleObserver;
use crate::domain::lifecycle::WorkloadEvent;
use crate::domain::lifecycle::WorkloadId;

/// A pod that must be told it was not admitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRejection {
    pub pod: PodRef,
    pub exhausted_classes: Vec<String>,
}

/// Feeds pod updates into the admission controller.
///
/// Keeps track of the pods it submitted so that pods which vanished while the
/// watch was down can be released on relist.
pub struct PodLifecycle {
    controller: Arc<AdmissionController>,
    tracked: HashMap<WorkloadId, PodRef>,
}

impl PodLifecycle {
    pub fn new(controller: Arc<AdmissionController>) -> Self {
        Self {
            controller,
            tracked: HashMap::new(),
        }
    }

    /// Apply one update. Returns the rejection to report, if any.
    pub fn apply(&mut self, update: PodUpdate) -> Option<PodRejection> {
        match update {
            PodUpdate::Pending { pod, request } => self.submit(pod, request),
            PodUpdate::Running { pod, request } => {
                self.start(pod, request);
                None
            }
            PodUpdate::Finished { pod, failed } => {
                self.notify(WorkloadEvent::Terminated {
                    workload_id: pod.workload_id(),
                    failed,
                });
                None
            }
            PodUpdate::Deleted { pod } => {
                let workload_id = pod.workload_id();
                self.tracked.remove(&workload_id);
                self.notify(WorkloadEvent::Removed { workload_id });
                None
            }
            PodUpdate::Relisted { live } => {
                self.prune(&live);
                None
            }
        }
    }

    fn notify(&self, event: WorkloadEvent) -> Option<EventOutcome> {
        let workload_id = event.workload_id().clone();
        match self.controller.observe(event) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(workload_id = %workload_id, "Pod event not applied: {e}");
                None
            }
        }
    }

    fn submit(&mut self, pod: PodRef, request: ResourceRequest) -> Option<PodRejection> {
        let workload_id = pod.workload_id();

        // Watch events repeat; only the first sighting of a pod instance is a
        // submission. A rejected pod keeps being reported until its status
        // reflects the rejection.
        if let Some(status) = self.controller.workload(workload_id.as_str()) {
            if status.phase == WorkloadPhase::Rejected {
                return Some(PodRejection {
                    pod,
                    exhausted_classes: status.exhausted_classes,
                });
            }
            debug!(workload_id = %workload_id, phase = %status.phase, "Pod already known");
            return None;
        }

        self.tracked.insert(workload_id.clone(), pod.clone());
        let outcome = self.notify(WorkloadEvent::Submitted {
            workload_id,
            request,
        })?;

        match outcome {
            EventOutcome::Decided(AdmissionDecision::Rejected { exhausted_classes }) => {
                Some(PodRejection {
                    pod,
                    exhausted_classes,
                })
            }
            _ => None,
        }
    }

    fn start(&mut self, pod: PodRef, request: ResourceRequest) {
        let workload_id = pod.workload_id();

        // A running pod we have never seen was admitted before a restart;
        // admitting it again restores its reservation. One whose restore was
        // rejected is retried, since capacity may have been freed since.
        let known = self
            .controller
            .workload(workload_id.as_str())
            .map(|status| status.phase);
        if matches!(known, None | Some(WorkloadPhase::Rejected)) {
            let retry = known.is_some();
            if !retry {
                info!(workload_id = %workload_id, "Restoring reservation of running pod");
            }
            self.tracked.insert(workload_id.clone(), pod);
            let outcome = self.notify(WorkloadEvent::Submitted {
                workload_id: workload_id.clone(),
                request,
            });
            match outcome {
                Some(EventOutcome::Decided(AdmissionDecision::Accepted { .. })) => {}
                Some(EventOutcome::Decided(AdmissionDecision::Rejected { exhausted_classes })) => {
                    if retry {
                        debug!(workload_id = %workload_id, "Running pod still cannot be restored");
                    } else {
                        warn!(
                            workload_id = %workload_id,
                            exhausted_classes = ?exhausted_classes,
                            "Running pod could not be restored, node is overcommitted"
                        );
                    }
                    return;
                }
                _ => return,
            }
        }

        self.notify(WorkloadEvent::Started { workload_id });
    }

    /// Release tracked pods missing from a full relist
    fn prune(&mut self, live: &[PodRef]) {
        let live: HashSet<WorkloadId> = live.iter().map(PodRef::workload_id).collect();
        let gone: Vec<WorkloadId> = self
            .tracked
            .keys()
            .filter(|id| !live.contains(*id))
            .cloned()
            .collect();

        for workload_id in gone {
            info!(workload_id = %workload_id, "Pod disappeared while unwatched");
            self.tracked.remove(&workload_id);
            self.notify(WorkloadEvent::Removed { workload_id });
        }
    }

    pub fn tracked(&self) -> usize {
        self.tracked.len()
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::domain::pool::ClassInventory;
    use crate::domain::pool::ResourcePool;

    const GPU: &str = "nvidia.com/gpu";

    fn lifecycle(gpus: u32) -> (Arc<AdmissionController>, PodLifecycle) {
        let pool =
            ResourcePool::from_inventory(vec![ClassInventory::with_count(GPU, gpus)]).unwrap();
        let controller = Arc::new(AdmissionController::new(pool));
        (controller.clone(), PodLifecycle::new(controller))
    }

    fn pod(name: &str) -> PodRef {
        PodRef {
            namespace: "default".to_string(),
            name: name.to_string(),
            uid: format!("{name}-uid"),
        }
    }

    fn one_gpu() -> ResourceRequest {
        ResourceRequest::from([(GPU.to_string(), 1)])
    }

    fn pending(name: &str) -> PodUpdate {
        PodUpdate::Pending {
            pod: pod(name),
            request: one_gpu(),
        }
    }

    fn running(name: &str) -> PodUpdate {
        PodUpdate::Running {
            pod: pod(name),
            request: one_gpu(),
        }
    }

    #[test_log::test]
    fn second_pod_is_rejected_until_first_is_deleted() {
        let (controller, mut lifecycle) = lifecycle(1);

        assert_eq!(lifecycle.apply(pending("success")), None);
        assert_eq!(lifecycle.apply(running("success")), None);

        let rejection = lifecycle.apply(pending("failure")).unwrap();
        assert_eq!(rejection.pod, pod("failure"));
        assert_eq!(rejection.exhausted_classes, vec![GPU.to_string()]);

        // Rejected pod status patch lands, the pod fails.
        lifecycle.apply(PodUpdate::Finished {
            pod: pod("failure"),
            failed: true,
        });
        lifecycle.apply(PodUpdate::Deleted { pod: pod("success") });
        lifecycle.apply(PodUpdate::Deleted { pod: pod("failure") });
        assert_eq!(controller.available(GPU), 1);

        assert_eq!(lifecycle.apply(pending("failure")), None);
        assert_eq!(controller.available(GPU), 0);
    }

    #[test_log::test]
    fn repeated_events_do_not_resubmit() {
        let (controller, mut lifecycle) = lifecycle(2);

        lifecycle.apply(pending("a"));
        lifecycle.apply(pending("a"));
        lifecycle.apply(running("a"));
        lifecycle.apply(running("a"));

        assert_eq!(controller.available(GPU), 1);
        assert_eq!(controller.stats().admitted, 1);
        assert_eq!(
            controller.workload(pod("a").workload_id().as_str()).unwrap().phase,
            WorkloadPhase::Running
        );
    }

    #[test_log::test]
    fn rejected_pod_is_reported_again() {
        let (_controller, mut lifecycle) = lifecycle(0);
        assert!(lifecycle.apply(pending("a")).is_some());
        assert!(lifecycle.apply(pending("a")).is_some());
    }

    #[test_log::test]
    fn running_pod_reservation_is_restored() {
        let (controller, mut lifecycle) = lifecycle(1);

        lifecycle.apply(running("survivor"));

        assert_eq!(controller.available(GPU), 0);
        assert_eq!(
            controller
                .workload(pod("survivor").workload_id().as_str())
                .unwrap()
                .phase,
            WorkloadPhase::Running
        );
        assert!(lifecycle.apply(pending("late")).is_some());
    }

    #[test_log::test]
    fn relist_releases_vanished_pods() {
        let (controller, mut lifecycle) = lifecycle(2);

        lifecycle.apply(running("kept"));
        lifecycle.apply(running("vanished"));
        assert_eq!(controller.available(GPU), 0);

        lifecycle.apply(PodUpdate::Relisted {
            live: vec![pod("kept")],
        });

        assert_eq!(controller.available(GPU), 1);
        assert_eq!(lifecycle.tracked(), 1);
        assert_eq!(controller.workload(pod("vanished").workload_id().as_str()), None);
    }

    #[test_log::test]
    fn recreated_pod_is_a_new_workload() {
        let (controller, mut lifecycle) = lifecycle(1);

        lifecycle.apply(pending("job"));
        let recreated = PodRef {
            uid: "other-uid".to_string(),
            ..pod("job")
        };
        let rejection = lifecycle.apply(PodUpdate::Pending {
            pod: recreated,
            request: one_gpu(),
        });

        assert!(rejection.is_some());
        assert_eq!(controller.stats().rejected, 1);
    }

    #[test_log::test]
    fn rejected_restore_is_retried_once_capacity_frees() {
        let (controller, mut lifecycle) = lifecycle(1);
        lifecycle.apply(pending("holder"));

        // Overcommitted: the running pod cannot get its unit back yet.
        lifecycle.apply(running("late"));
        lifecycle.apply(running("late"));
        let phase = |name: &str| {
            controller
                .workload(pod(name).workload_id().as_str())
                .map(|status| status.phase)
        };
        assert_eq!(phase("late"), Some(WorkloadPhase::Rejected));

        lifecycle.apply(PodUpdate::Deleted { pod: pod("holder") });
        lifecycle.apply(running("late"));

        assert_eq!(phase("late"), Some(WorkloadPhase::Running));
        assert_eq!(controller.available(GPU), 0);
        assert_eq!(controller.holder_of(GPU, 0), Some(pod("late").workload_id()));
    }
}
