//! Device-node discovery
//!
//! Counts `/dev/nvidia<N>` entries. Control nodes such as `nvidiactl`,
//! `nvidia-uvm` or `nvidia-modeset` do not represent a GPU and are skipped.

use std::path::Path;
use std::path::PathBuf;

use crate::domain::pool::ClassInventory;
use crate::domain::pool::DeviceDiscovery;
use crate::domain::pool::DeviceUnit;
use crate::domain::pool::DiscoveryError;

const DEVICE_PREFIX: &str = "nvidia";

/// Enumerates GPUs from device nodes under a device directory
#[derive(Debug, Clone)]
pub struct DevNodeDiscovery {
    dev_dir: PathBuf,
    resource_name: String,
}

impl DevNodeDiscovery {
    pub fn new(dev_dir: impl Into<PathBuf>, resource_name: impl Into<String>) -> Self {
        Self {
            dev_dir: dev_dir.into(),
            resource_name: resource_name.into(),
        }
    }
}

/// GPU minor number encoded in a device node name (`nvidia3` -> 3)
fn gpu_minor(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    let digits = name.strip_prefix(DEVICE_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl DeviceDiscovery for DevNodeDiscovery {
    fn name(&self) -> &'static str {
        "dev-nodes"
    }

    fn discover(&self) -> Result<Vec<ClassInventory>, DiscoveryError> {
        if !self.dev_dir.is_dir() {
            return Err(DiscoveryError::Unavailable {
                source_name: self.name(),
                message: format!("{} is not a directory", self.dev_dir.display()),
            });
        }

        let dev_dir = glob::Pattern::escape(&self.dev_dir.to_string_lossy());
        let pattern = format!("{dev_dir}/{DEVICE_PREFIX}*");
        let entries = glob::glob(&pattern).map_err(|e| DiscoveryError::Unavailable {
            source_name: self.name(),
            message: format!("invalid device pattern {pattern}: {e}"),
        })?;

        let mut devices: Vec<DeviceUnit> = entries
            .filter_map(Result::ok)
            .filter_map(|path| {
                let minor = gpu_minor(&path)?;
                let id = path.file_name()?.to_string_lossy().into_owned();
                Some(DeviceUnit::new(minor, id).with_device_path(path))
            })
            .collect();
        devices.sort_by_key(|d| d.index);

        tracing::info!(
            dev_dir = %self.dev_dir.display(),
            count = devices.len(),
            "Discovered GPU device nodes"
        );

        Ok(vec![ClassInventory::new(self.resource_name.clone(), devices)])
    }
}
