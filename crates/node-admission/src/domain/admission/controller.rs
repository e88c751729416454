//! Exclusive-resource admission controller
//!
//! All node state (pool, reservations and workload records) lives behind a
//! single mutex. `admit` checks every requested class and reserves units
//! while holding it, so two concurrent admissions can never both see the
//! same free unit, and `release` can never interleave with a half-finished
//! admission.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use api_types::AdmissionDecision;
use api_types::DeviceGrants;
use api_types::PoolSnapshot;
use api_types::ResourceRequest;
use api_types::WorkloadPhase;
use api_types::WorkloadStatus;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::domain::allocation::AllocationError;
use crate::domain::allocation::AllocationTracker;
use crate::domain::lifecycle::LifecycleError;
use crate::domain::lifecycle::WorkloadId;
use crate::domain::lifecycle::WorkloadRecord;
use crate::domain::pool::DeviceDiscovery;
use crate::domain::pool::DiscoveryError;
use crate::domain::pool::ResourcePool;

/// Errors returned by admission and lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("Workload {workload_id} is already {phase}")]
    WorkloadAlreadyActive {
        workload_id: WorkloadId,
        phase: WorkloadPhase,
    },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

/// Running totals of admission outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionStats {
    pub admitted: u64,
    pub rejected: u64,
    pub released: u64,
}

#[derive(Debug, Default)]
struct NodeState {
    pool: ResourcePool,
    tracker: AllocationTracker,
    workloads: HashMap<WorkloadId, WorkloadRecord>,
    next_instance: u64,
    stats: AdmissionStats,
}

impl NodeState {
    fn release_units(&mut self, workload_id: &str) -> u64 {
        self.tracker
            .release(&mut self.pool, workload_id)
            .iter()
            .map(|r| r.unit_count())
            .sum()
    }

    /// Release units and close the record if it is still active.
    fn finish(&mut self, workload_id: &str, phase: WorkloadPhase) -> Result<u64, AdmissionError> {
        let released = self.release_units(workload_id);
        if let Some(record) = self.workloads.get_mut(workload_id) {
            if record.phase.is_active() {
                record.transition(phase)?;
            }
        }

        if released > 0 {
            self.stats.released += 1;
            info!(
                workload_id = %workload_id,
                units = released,
                phase = %phase,
                "Released workload reservations"
            );
        } else {
            debug!(workload_id = %workload_id, "Nothing to release");
        }
        Ok(released)
    }
}

/// Node-local admission controller for exclusive, indivisible resources
#[derive(Debug)]
pub struct AdmissionController {
    state: Mutex<NodeState>,
}

impl AdmissionController {
    pub fn new(pool: ResourcePool) -> Self {
        Self {
            state: Mutex::new(NodeState {
                pool,
                ..NodeState::default()
            }),
        }
    }

    /// Discover node devices and build a controller over them.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError`] if enumeration fails; this is not retried
    pub fn discover(source: &dyn DeviceDiscovery) -> Result<Self, DiscoveryError> {
        Ok(Self::new(ResourcePool::discover(source)?))
    }

    fn lock(&self) -> MutexGuard<'_, NodeState> {
        // Every mutation completes before the guard drops, so a poisoned
        // state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit or reject a workload against current availability.
    ///
    /// Either every requested class is reserved, or nothing is. Zero-unit
    /// entries and empty requests are accepted without reservations.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::WorkloadAlreadyActive`] if the id names a workload that
    ///   is still admitted or running; the pool is untouched
    #[tracing::instrument(skip_all, fields(workload_id = tracing::field::Empty))]
    pub fn admit(
        &self,
        workload_id: impl Into<WorkloadId>,
        request: &ResourceRequest,
    ) -> Result<AdmissionDecision, AdmissionError> {
        let workload_id = workload_id.into();
        tracing::Span::current().record("workload_id", tracing::field::display(&workload_id));

        let mut guard = self.lock();
        let state = &mut *guard;

        if let Some(existing) = state.workloads.get(&workload_id) {
            if existing.phase.is_active() {
                return Err(AdmissionError::WorkloadAlreadyActive {
                    workload_id,
                    phase: existing.phase,
                });
            }
        }

        state.next_instance += 1;
        let mut record =
            WorkloadRecord::new(workload_id.clone(), state.next_instance, request.clone());

        let exhausted = state.pool.exhausted_classes(request);
        if !exhausted.is_empty() {
            record.transition(WorkloadPhase::Rejected)?;
            record.exhausted_classes = exhausted.clone();
            state.workloads.insert(workload_id, record);
            state.stats.rejected += 1;

            info!(exhausted_classes = ?exhausted, "Workload rejected");
            return Ok(AdmissionDecision::Rejected {
                exhausted_classes: exhausted,
            });
        }

        let mut devices = DeviceGrants::new();
        for (class, &units) in request {
            if units == 0 {
                continue;
            }

            let reserved = match state
                .tracker
                .reserve(&mut state.pool, &workload_id, class, units)
            {
                Ok(reservation) => reservation.units.clone(),
                Err(e) => {
                    // Roll back whatever this call already reserved.
                    state.release_units(workload_id.as_str());
                    warn!(error = %e, "Reservation failed after availability check");
                    return Err(e.into());
                }
            };
            devices.insert(class.clone(), state.pool.grants(class, &reserved));
        }

        record.transition(WorkloadPhase::Admitted)?;
        record.devices = devices.clone();
        state.workloads.insert(workload_id, record);
        state.stats.admitted += 1;

        info!(devices = ?devices, "Workload admitted");
        Ok(AdmissionDecision::Accepted { devices })
    }

    /// Release every unit held by `workload_id`.
    ///
    /// Idempotent: releasing twice, or releasing a workload that was never
    /// admitted, is a no-op. Active workloads move to Terminated. Returns the
    /// number of units credited back by this call.
    pub fn release(&self, workload_id: &str) -> Result<u64, AdmissionError> {
        self.lock().finish(workload_id, WorkloadPhase::Terminated)
    }

    /// Runtime signal that an admitted workload started running.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::UnknownWorkload`] if the id was never submitted
    /// - [`LifecycleError::InvalidTransition`] if the workload is not admitted
    pub fn mark_running(&self, workload_id: &str) -> Result<(), AdmissionError> {
        let mut state = self.lock();
        let record = state.workloads.get_mut(workload_id).ok_or_else(|| {
            LifecycleError::UnknownWorkload {
                workload_id: workload_id.into(),
            }
        })?;

        if record.phase == WorkloadPhase::Running {
            return Ok(());
        }
        record.transition(WorkloadPhase::Running)?;
        debug!(workload_id = %workload_id, "Workload running");
        Ok(())
    }

    /// Runtime signal that a workload finished; releases its units.
    pub fn mark_terminated(&self, workload_id: &str, failed: bool) -> Result<u64, AdmissionError> {
        let phase = if failed {
            WorkloadPhase::Failed
        } else {
            WorkloadPhase::Terminated
        };
        self.lock().finish(workload_id, phase)
    }

    /// Release the workload and drop its record entirely.
    pub fn forget(&self, workload_id: &str) -> Result<u64, AdmissionError> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let released = state.finish(workload_id, WorkloadPhase::Terminated)?;
        if state.workloads.remove(workload_id).is_some() {
            debug!(workload_id = %workload_id, "Workload record removed");
        }
        Ok(released)
    }

    /// Units of `class` currently free; 0 for unknown classes
    pub fn available(&self, class: &str) -> u64 {
        self.lock().pool.available_units(class)
    }

    /// Units of `class` discovered on the node; 0 for unknown classes
    pub fn total(&self, class: &str) -> u64 {
        self.lock().pool.total_units(class)
    }

    /// Discovered class names, sorted
    pub fn classes(&self) -> Vec<String> {
        self.lock().pool.class_names().map(str::to_string).collect()
    }

    pub fn pool_snapshot(&self) -> PoolSnapshot {
        self.lock().pool.snapshot()
    }

    pub fn workload(&self, workload_id: &str) -> Option<WorkloadStatus> {
        self.lock()
            .workloads
            .get(workload_id)
            .map(WorkloadRecord::status)
    }

    /// Workload records currently retained, terminal ones included
    pub fn workload_count(&self) -> usize {
        self.lock().workloads.len()
    }

    /// Workload holding `unit` of `class`, if any
    pub fn holder_of(&self, class: &str, unit: u32) -> Option<WorkloadId> {
        self.lock().tracker.holder_of(class, unit).cloned()
    }

    pub fn stats(&self) -> AdmissionStats {
        self.lock().stats
    }
}
