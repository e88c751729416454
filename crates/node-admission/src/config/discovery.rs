use std::path::PathBuf;

use clap::Args;
use clap::ValueEnum;

/// Device enumeration backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DiscoveryKind {
    /// Query NVIDIA GPUs through NVML
    Nvml,
    /// Count `/dev/nvidia<N>` device nodes
    DevNodes,
    /// Read a static YAML inventory
    Inventory,
}

#[derive(Args, Debug, Clone)]
pub struct DiscoveryArgs {
    #[arg(
        id = "discovery",
        long = "discovery",
        value_enum,
        env = "DISCOVERY",
        default_value = "nvml",
        help = "How node devices are enumerated"
    )]
    pub kind: DiscoveryKind,

    #[arg(
        long,
        env = "GPU_RESOURCE_NAME",
        default_value = "nvidia.com/gpu",
        help = "Resource class name used for discovered GPUs"
    )]
    pub gpu_resource_name: String,

    #[arg(
        long,
        default_value = "/dev",
        value_hint = clap::ValueHint::DirPath,
        help = "Device directory scanned by dev-nodes discovery"
    )]
    pub dev_dir: PathBuf,

    #[arg(
        long,
        env = "DEVICE_INVENTORY_PATH",
        value_hint = clap::ValueHint::FilePath,
        required_if_eq("discovery", "inventory"),
        help = "Static device inventory YAML, e.g. /etc/node-admission/inventory.yaml"
    )]
    pub inventory_path: Option<PathBuf>,
}
