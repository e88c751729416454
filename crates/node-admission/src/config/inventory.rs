use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::domain::pool::ClassInventory;
use crate::domain::pool::DeviceUnit;
use crate::domain::pool::DiscoveryError;

/// Static device inventory, as read from YAML
///
/// ```yaml
/// classes:
///   - name: nvidia.com/gpu
///     devices:
///       - index: 0
///         id: GPU-5a8c6f3e
///         devicePath: /dev/nvidia0
///   - name: example.com/fpga
///     count: 2
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryFile {
    #[serde(default)]
    pub classes: Vec<InventoryClass>,
}

/// One resource class in a static inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryClass {
    /// Resource class name (e.g. "nvidia.com/gpu")
    pub name: String,
    /// Explicit device list
    #[serde(default)]
    pub devices: Vec<DeviceUnit>,
    /// Number of anonymous units, when no device list is given
    #[serde(default)]
    pub count: Option<u32>,
}

impl InventoryFile {
    pub fn parse(yaml: &str) -> Result<Self, DiscoveryError> {
        serde_yaml::from_str(yaml).map_err(|e| DiscoveryError::InvalidInventory {
            message: e.to_string(),
        })
    }

    /// Load and parse an inventory file
    pub fn load(path: &Path) -> Result<Self, DiscoveryError> {
        tracing::info!("Loading device inventory from {:?}", path);

        let yaml = std::fs::read_to_string(path).map_err(|e| DiscoveryError::Unavailable {
            source_name: "inventory",
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::parse(&yaml)
    }

    pub fn into_inventory(self) -> Result<Vec<ClassInventory>, DiscoveryError> {
        self.classes
            .into_iter()
            .map(|class| match (class.devices.is_empty(), class.count) {
                (false, Some(_)) => Err(DiscoveryError::InvalidInventory {
                    message: format!("class {} sets both devices and count", class.name),
                }),
                (true, Some(count)) => Ok(ClassInventory::with_count(class.name, count)),
                (_, None) => Ok(ClassInventory::new(class.name, class.devices)),
            })
            .collect()
    }
}
