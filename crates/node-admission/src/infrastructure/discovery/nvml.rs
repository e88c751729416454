use nvml_wrapper::error::NvmlError;
use nvml_wrapper::Nvml;

use crate::domain::pool::ClassInventory;
use crate::domain::pool::DeviceDiscovery;
use crate::domain::pool::DeviceUnit;
use crate::domain::pool::DiscoveryError;

/// Enumerates NVIDIA GPUs through NVML, one unit per GPU
#[derive(Debug, Clone)]
pub struct NvmlDiscovery {
    resource_name: String,
}

impl NvmlDiscovery {
    pub fn new(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
        }
    }
}

fn unavailable(e: NvmlError) -> DiscoveryError {
    DiscoveryError::Unavailable {
        source_name: "nvml",
        message: e.to_string(),
    }
}

fn init_nvml() -> Result<Nvml, NvmlError> {
    match Nvml::init() {
        Ok(nvml) => {
            tracing::info!("NVML initialized successfully");
            Ok(nvml)
        }
        Err(_) => {
            tracing::warn!("Standard NVML init failed, trying with explicit library path");
            let nvml = Nvml::builder()
                .lib_path(std::ffi::OsStr::new("libnvidia-ml.so.1"))
                .init()?;
            tracing::info!("NVML initialized with explicit library path");
            Ok(nvml)
        }
    }
}

impl DeviceDiscovery for NvmlDiscovery {
    fn name(&self) -> &'static str {
        "nvml"
    }

    fn discover(&self) -> Result<Vec<ClassInventory>, DiscoveryError> {
        let nvml = init_nvml().map_err(unavailable)?;
        let device_count = nvml.device_count().map_err(unavailable)?;

        tracing::info!("Discovered {} GPU device(s)", device_count);

        let mut devices = Vec::with_capacity(device_count as usize);
        for index in 0..device_count {
            let device = nvml.device_by_index(index).map_err(unavailable)?;
            let uuid = device.uuid().map_err(unavailable)?;
            let name = device.name().unwrap_or_else(|_| "unknown".to_string());
            // Device nodes are numbered by minor number, which need not match
            // the NVML enumeration order.
            let minor = device.minor_number().unwrap_or(index);

            tracing::info!("Found GPU {}: {} ({}) at /dev/nvidia{}", index, uuid, name, minor);
            devices.push(
                DeviceUnit::new(index, uuid).with_device_path(format!("/dev/nvidia{minor}")),
            );
        }

        Ok(vec![ClassInventory::new(self.resource_name.clone(), devices)])
    }
}
