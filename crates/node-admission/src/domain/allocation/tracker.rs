//! Allocation tracking
//!
//! Maps admitted workloads to the exact units they hold. Reservations are
//! created only from inside the admission critical section and dropped on
//! release, at which point their units are credited back to the pool.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::lifecycle::WorkloadId;
use crate::domain::pool::ResourcePool;

/// Errors raised while reserving units
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("Not enough free units of {class}: requested {requested}, available {available}")]
    InsufficientUnits {
        class: String,
        requested: u64,
        available: u64,
    },

    #[error("Workload {workload_id} already holds a reservation for {class}")]
    DuplicateReservation {
        workload_id: WorkloadId,
        class: String,
    },
}

/// Units of one resource class held by one workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub workload_id: WorkloadId,
    pub class: String,
    pub units: Vec<u32>,
}

impl Reservation {
    pub fn unit_count(&self) -> u64 {
        self.units.len() as u64
    }
}

/// Owner of every live reservation on the node
#[derive(Debug, Default)]
pub struct AllocationTracker {
    reservations: HashMap<WorkloadId, Vec<Reservation>>,
}

impl AllocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take `units` units of `class` from `pool` on behalf of `workload_id`.
    ///
    /// # Errors
    ///
    /// - [`AllocationError::InsufficientUnits`] if the pool cannot cover the request;
    ///   the pool is left untouched
    /// - [`AllocationError::DuplicateReservation`] if the workload already holds `class`
    pub(crate) fn reserve(
        &mut self,
        pool: &mut ResourcePool,
        workload_id: &WorkloadId,
        class: &str,
        units: u64,
    ) -> Result<&Reservation, AllocationError> {
        let held = self.reservations.entry(workload_id.clone()).or_default();
        if held.iter().any(|r| r.class == class) {
            return Err(AllocationError::DuplicateReservation {
                workload_id: workload_id.clone(),
                class: class.to_string(),
            });
        }

        let taken =
            pool.take_units(class, units)
                .ok_or_else(|| AllocationError::InsufficientUnits {
                    class: class.to_string(),
                    requested: units,
                    available: pool.available_units(class),
                })?;

        debug!(
            workload_id = %workload_id,
            class = %class,
            units = ?taken,
            "Reserved units"
        );

        held.push(Reservation {
            workload_id: workload_id.clone(),
            class: class.to_string(),
            units: taken,
        });
        Ok(&held[held.len() - 1])
    }

    /// Drop every reservation of `workload_id` and credit its units back.
    ///
    /// Releasing an unknown workload is a no-op and returns nothing.
    pub(crate) fn release(
        &mut self,
        pool: &mut ResourcePool,
        workload_id: &str,
    ) -> Vec<Reservation> {
        let Some(released) = self.reservations.remove(workload_id) else {
            return Vec::new();
        };

        for reservation in &released {
            let credited = pool.credit_units(&reservation.class, &reservation.units);
            debug!(
                workload_id = %workload_id,
                class = %reservation.class,
                units = credited,
                "Credited units back to pool"
            );
        }
        released
    }

    pub fn reservations(&self, workload_id: &str) -> &[Reservation] {
        self.reservations
            .get(workload_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn holds(&self, workload_id: &str) -> bool {
        self.reservations
            .get(workload_id)
            .is_some_and(|held| !held.is_empty())
    }

    /// Workload holding `unit` of `class`, if any
    pub fn holder_of(&self, class: &str, unit: u32) -> Option<&WorkloadId> {
        self.reservations
            .values()
            .flatten()
            .find(|r| r.class == class && r.units.contains(&unit))
            .map(|r| &r.workload_id)
    }

    /// Units of `class` held across all workloads
    pub fn reserved_units(&self, class: &str) -> u64 {
        self.reservations
            .values()
            .flatten()
            .filter(|r| r.class == class)
            .map(Reservation::unit_count)
            .sum()
    }
}
