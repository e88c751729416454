//! Resource pool type definitions

use std::path::PathBuf;

use api_types::DeviceGrant;
use serde::Deserialize;
use serde::Serialize;

/// Errors raised while enumerating node devices
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Device enumeration unavailable ({source_name}): {message}")]
    Unavailable {
        source_name: &'static str,
        message: String,
    },

    #[error("Invalid device inventory: {message}")]
    InvalidInventory { message: String },

    #[error("Resource class {class} listed more than once")]
    DuplicateClass { class: String },

    #[error("Device index {index} listed more than once in class {class}")]
    DuplicateDevice { class: String, index: u32 },
}

/// One indivisible unit of a resource class, e.g. a single GPU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUnit {
    /// Unit index, unique within its class
    pub index: u32,
    /// Stable identifier (GPU UUID, device node name, ...)
    pub id: String,
    /// Device node handed to workloads holding this unit
    #[serde(default)]
    pub device_path: Option<PathBuf>,
}

impl DeviceUnit {
    pub fn new(index: u32, id: impl Into<String>) -> Self {
        Self {
            index,
            id: id.into(),
            device_path: None,
        }
    }

    pub fn with_device_path(mut self, device_path: impl Into<PathBuf>) -> Self {
        self.device_path = Some(device_path.into());
        self
    }

    pub(crate) fn grant(&self) -> DeviceGrant {
        DeviceGrant {
            index: self.index,
            id: self.id.clone(),
            device_path: self.device_path.clone(),
        }
    }
}

/// Devices found for one resource class by a discovery source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInventory {
    pub class: String,
    pub devices: Vec<DeviceUnit>,
}

impl ClassInventory {
    pub fn new(class: impl Into<String>, devices: Vec<DeviceUnit>) -> Self {
        Self {
            class: class.into(),
            devices,
        }
    }

    /// Anonymous units `0..count`, used when only a capacity is known
    pub fn with_count(class: impl Into<String>, count: u32) -> Self {
        let class = class.into();
        let devices = (0..count)
            .map(|index| DeviceUnit::new(index, format!("{class}-{index}")))
            .collect();
        Self { class, devices }
    }
}

/// Enumerates the devices present on the node
pub trait DeviceDiscovery: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Enumerate every resource class this source knows about.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::Unavailable`] if the underlying enumeration cannot run
    fn discover(&self) -> Result<Vec<ClassInventory>, DiscoveryError>;
}
