pub mod registry;
pub mod types;

pub use registry::ResourcePool;
pub use types::ClassInventory;
pub use types::DeviceDiscovery;
pub use types::DeviceUnit;
pub use types::DiscoveryError;
