use core::error::Error;

use api_types::ResourceRequest;

use crate::domain::lifecycle::WorkloadId;

/// Identity of a pod on this node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
    pub uid: String,
}

impl PodRef {
    /// Workload id for this pod instance.
    ///
    /// Includes the uid, so a pod re-created under the same name is a
    /// different workload.
    pub fn workload_id(&self) -> WorkloadId {
        WorkloadId::new(format!("{}_{}_{}", self.namespace, self.name, self.uid))
    }
}

/// Pod changes relevant to admission, derived from watch events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodUpdate {
    /// Pod is waiting to start and asks for resources
    Pending {
        pod: PodRef,
        request: ResourceRequest,
    },
    /// Pod containers are running
    Running {
        pod: PodRef,
        request: ResourceRequest,
    },
    /// Pod reached Succeeded or Failed
    Finished { pod: PodRef, failed: bool },
    /// Pod is being deleted or is gone
    Deleted { pod: PodRef },
    /// The watch restarted; `live` lists every pod that still exists
    Relisted { live: Vec<PodRef> },
}

impl PodUpdate {
    pub fn pod(&self) -> Option<&PodRef> {
        match self {
            PodUpdate::Pending { pod, .. }
            | PodUpdate::Running { pod, .. }
            | PodUpdate::Finished { pod, .. }
            | PodUpdate::Deleted { pod } => Some(pod),
            PodUpdate::Relisted { .. } => None,
        }
    }
}

/// Errors that can occur during Kubernetes operations.
#[derive(Debug, derive_more::Display)]
pub enum KubernetesError {
    #[display("Failed to connect to Kubernetes API: {message}")]
    ConnectionFailed { message: String },
    #[display("Failed to watch pods: {message}")]
    WatchFailed { message: String },
    #[display("Invalid resource quantity {value:?} for {class}")]
    InvalidQuantity { class: String, value: String },
    #[display("Failed to update status of pod {pod_name} in namespace {namespace}")]
    StatusPatchFailed { pod_name: String, namespace: String },
}

impl Error for KubernetesError {}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn workload_id_includes_uid() {
        let pod = PodRef {
            namespace: "default".to_string(),
            name: "cuda-vectoradd".to_string(),
            uid: "1234".to_string(),
        };
        assert_eq!(pod.workload_id().as_str(), "default_cuda-vectoradd_1234");

        let recreated = PodRef {
            uid: "5678".to_string(),
            ..pod.clone()
        };
        assert!(pod.workload_id() != recreated.workload_id());
    }
}
