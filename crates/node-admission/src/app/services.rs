use std::sync::Arc;

use crate::domain::admission::AdmissionController;
use crate::infrastructure::k8s::PodStatusReporter;
use crate::infrastructure::k8s::PodWatcher;

/// Pod watching and rejection reporting, present when Kubernetes is enabled
pub struct KubernetesServices {
    pub pod_watcher: Arc<PodWatcher>,
    pub status_reporter: PodStatusReporter,
}

/// Application dependencies - simple struct with Arc-wrapped services
pub struct ApplicationServices {
    pub controller: Arc<AdmissionController>,
    pub kubernetes: Option<KubernetesServices>,
}
