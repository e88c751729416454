//! Kubernetes integration module.
//!
//! Pods scheduled to this node are the workloads. The main components are:
//! - [`PodWatcher`]: watches pod creation/update/deletion events
//! - [`PodLifecycle`]: turns pod updates into admission decisions and releases
//! - [`PodStatusReporter`]: marks rejected pods as failed

pub mod pod_lifecycle;
pub mod pod_resources;
pub mod pod_watcher;
pub mod status_reporter;
pub mod types;

pub use pod_lifecycle::PodLifecycle;
pub use pod_lifecycle::PodRejection;
pub use pod_watcher::PodWatcher;
pub use status_reporter::PodStatusReporter;
pub use types::KubernetesError;
pub use types::PodRef;
pub use types::PodUpdate;
