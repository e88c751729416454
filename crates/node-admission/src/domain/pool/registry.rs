//! Resource pool registry
//!
//! Holds the devices discovered on the node, grouped by resource class, and the
//! set of units that are currently free. Capacity is fixed once discovery has
//! run; afterwards only [`ResourcePool::take_units`] and
//! [`ResourcePool::credit_units`] change availability, and both are driven by
//! the allocation tracker from inside the admission critical section.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use api_types::ClassCapacity;
use api_types::DeviceGrant;
use api_types::PoolSnapshot;
use api_types::ResourceRequest;
use tracing::info;
use tracing::warn;

use super::types::ClassInventory;
use super::types::DeviceDiscovery;
use super::types::DeviceUnit;
use super::types::DiscoveryError;

#[derive(Debug, Clone)]
struct ClassPool {
    devices: BTreeMap<u32, DeviceUnit>,
    free: BTreeSet<u32>,
}

impl ClassPool {
    fn total(&self) -> u64 {
        self.devices.len() as u64
    }

    fn available(&self) -> u64 {
        self.free.len() as u64
    }
}

/// Total and free units of every discovered resource class
#[derive(Debug, Clone, Default)]
pub struct ResourcePool {
    classes: BTreeMap<String, ClassPool>,
}

impl ResourcePool {
    /// Run discovery once and build the pool from its result.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::Unavailable`] if the source cannot enumerate devices
    /// - [`DiscoveryError::DuplicateClass`] / [`DiscoveryError::DuplicateDevice`]
    ///   if the source reports the same class or unit twice
    pub fn discover(source: &dyn DeviceDiscovery) -> Result<Self, DiscoveryError> {
        let inventory = source.discover()?;
        let pool = Self::from_inventory(inventory)?;

        for class in pool.snapshot().classes {
            info!(
                source = source.name(),
                class = %class.class,
                total = class.total,
                "Discovered resource class"
            );
        }
        if pool.classes.is_empty() {
            warn!(source = source.name(), "Discovery found no resource classes");
        }

        Ok(pool)
    }

    /// Build a pool where every unit starts out free.
    pub fn from_inventory(inventory: Vec<ClassInventory>) -> Result<Self, DiscoveryError> {
        let mut classes = BTreeMap::new();

        for ClassInventory { class, devices } in inventory {
            if classes.contains_key(&class) {
                return Err(DiscoveryError::DuplicateClass { class });
            }

            let mut by_index = BTreeMap::new();
            for device in devices {
                let index = device.index;
                if by_index.insert(index, device).is_some() {
                    return Err(DiscoveryError::DuplicateDevice { class, index });
                }
            }

            let free = by_index.keys().copied().collect();
            classes.insert(
                class,
                ClassPool {
                    devices: by_index,
                    free,
                },
            );
        }

        Ok(Self { classes })
    }

    /// Units of `class` not held by any workload; 0 for unknown classes
    pub fn available_units(&self, class: &str) -> u64 {
        self.classes.get(class).map_or(0, ClassPool::available)
    }

    /// Units of `class` discovered on the node; 0 for unknown classes
    pub fn total_units(&self, class: &str) -> u64 {
        self.classes.get(class).map_or(0, ClassPool::total)
    }

    pub fn contains_class(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    /// Names of all discovered classes, sorted
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// Classes whose availability is below the requested amount, sorted.
    ///
    /// Zero-unit entries never count as exhausted.
    pub fn exhausted_classes(&self, request: &ResourceRequest) -> Vec<String> {
        request
            .iter()
            .filter(|(class, units)| **units > 0 && self.available_units(class) < **units)
            .map(|(class, _)| class.clone())
            .collect()
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            classes: self
                .classes
                .iter()
                .map(|(class, pool)| ClassCapacity {
                    class: class.clone(),
                    total: pool.total(),
                    available: pool.available(),
                })
                .collect(),
        }
    }

    /// Device grants for the given units of `class`
    pub fn grants(&self, class: &str, units: &[u32]) -> Vec<DeviceGrant> {
        let Some(pool) = self.classes.get(class) else {
            return Vec::new();
        };
        units
            .iter()
            .filter_map(|index| pool.devices.get(index))
            .map(DeviceUnit::grant)
            .collect()
    }

    /// Remove `units` free units of `class`, lowest index first.
    ///
    /// Returns `None` and leaves the pool untouched if not enough units are free.
    pub(crate) fn take_units(&mut self, class: &str, units: u64) -> Option<Vec<u32>> {
        let pool = self.classes.get_mut(class)?;
        if pool.available() < units {
            return None;
        }

        let taken: Vec<u32> = pool.free.iter().copied().take(units as usize).collect();
        for index in &taken {
            pool.free.remove(index);
        }
        Some(taken)
    }

    /// Return previously taken units of `class` to the free set.
    ///
    /// Units that are unknown or already free are ignored, so availability
    /// can never exceed the discovered total.
    pub(crate) fn credit_units(&mut self, class: &str, units: &[u32]) -> u64 {
        let Some(pool) = self.classes.get_mut(class) else {
            warn!(class = %class, "Credit for unknown resource class ignored");
            return 0;
        };

        let mut credited = 0;
        for index in units {
            if !pool.devices.contains_key(index) {
                warn!(class = %class, index = index, "Credit for unknown unit ignored");
                continue;
            }
            if pool.free.insert(*index) {
                credited += 1;
            } else {
                warn!(class = %class, index = index, "Unit was already free");
            }
        }
        credited
    }
}
