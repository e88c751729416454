//! Device discovery backends

pub mod dev_nodes;
pub mod inventory;
pub mod nvml;

use anyhow::Context;

pub use dev_nodes::DevNodeDiscovery;
pub use inventory::InventoryDiscovery;
pub use nvml::NvmlDiscovery;

use crate::config::DiscoveryArgs;
use crate::config::DiscoveryKind;
use crate::domain::pool::DeviceDiscovery;

/// Build the discovery backend selected on the command line
pub fn from_args(args: &DiscoveryArgs) -> anyhow::Result<Box<dyn DeviceDiscovery>> {
    let discovery: Box<dyn DeviceDiscovery> = match args.kind {
        DiscoveryKind::Nvml => Box::new(NvmlDiscovery::new(args.gpu_resource_name.clone())),
        DiscoveryKind::DevNodes => Box::new(DevNodeDiscovery::new(
            args.dev_dir.clone(),
            args.gpu_resource_name.clone(),
        )),
        DiscoveryKind::Inventory => {
            let path = args
                .inventory_path
                .clone()
                .context("--inventory-path is required for inventory discovery")?;
            Box::new(InventoryDiscovery::new(path))
        }
    };
    Ok(discovery)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use similar_asserts::assert_eq;

    use super::*;

    fn args(kind: DiscoveryKind) -> DiscoveryArgs {
        DiscoveryArgs {
            kind,
            gpu_resource_name: "nvidia.com/gpu".to_string(),
            dev_dir: PathBuf::from("/dev"),
            inventory_path: None,
        }
    }

    #[test]
    fn selects_backend() {
        assert_eq!(from_args(&args(DiscoveryKind::Nvml)).unwrap().name(), "nvml");
        assert_eq!(
            from_args(&args(DiscoveryKind::DevNodes)).unwrap().name(),
            "dev-nodes"
        );
    }

    #[test]
    fn inventory_requires_path() {
        assert!(from_args(&args(DiscoveryKind::Inventory)).is_err());

        let mut with_path = args(DiscoveryKind::Inventory);
        with_path.inventory_path = Some(PathBuf::from("/etc/inventory.yaml"));
        assert_eq!(from_args(&with_path).unwrap().name(), "inventory");
    }
}
