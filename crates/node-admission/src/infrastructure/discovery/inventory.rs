use std::path::PathBuf;

use crate::config::InventoryFile;
use crate::domain::pool::ClassInventory;
use crate::domain::pool::DeviceDiscovery;
use crate::domain::pool::DiscoveryError;

/// Reads node capacity from a static YAML inventory
#[derive(Debug, Clone)]
pub struct InventoryDiscovery {
    path: PathBuf,
}

impl InventoryDiscovery {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DeviceDiscovery for InventoryDiscovery {
    fn name(&self) -> &'static str {
        "inventory"
    }

    fn discover(&self) -> Result<Vec<ClassInventory>, DiscoveryError> {
        let inventory = InventoryFile::load(&self.path)?.into_inventory()?;
        tracing::info!("Loaded {} resource class(es) from inventory", inventory.len());
        Ok(inventory)
    }
}
