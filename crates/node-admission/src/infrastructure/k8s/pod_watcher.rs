use std::path::PathBuf;
use std::time::Duration;

use error_stack::Report;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::watcher::watcher;
use kube::runtime::watcher::Config;
use kube::runtime::watcher::Event;
use kube::Api;
use kube::Client;
use tokio::select;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::pod_resources::deleted_update;
use super::pod_resources::pod_ref;
use super::pod_resources::pod_update;
use super::types::KubernetesError;
use super::types::PodUpdate;
use crate::infrastructure::kube_client;

/// Watches the pods scheduled to this node.
///
/// Every pod event is classified against the node's resource classes and
/// forwarded as a [`PodUpdate`]. Pods that ask for none of those classes are
/// dropped here.
pub struct PodWatcher {
    namespace: Option<String>,
    node_name: String,
    kubeconfig: Option<PathBuf>,
    classes: Vec<String>,
}

impl PodWatcher {
    pub fn new(
        kubeconfig: Option<PathBuf>,
        namespace: Option<String>,
        node_name: String,
        classes: Vec<String>,
    ) -> Self {
        Self {
            namespace,
            node_name,
            kubeconfig,
            classes,
        }
    }

    /// Start watching pods for changes.
    ///
    /// Runs until cancelled. A failed or ended watch stream is restarted;
    /// each restart relists all pods, which replays their current state.
    ///
    /// # Errors
    ///
    /// - [`KubernetesError::ConnectionFailed`] if no client can be created
    #[tracing::instrument(
        skip(self, update_sender, cancellation_token),
        fields(namespace = ?self.namespace, node_name = %self.node_name)
    )]
    pub async fn run(
        &self,
        update_sender: mpsc::Sender<PodUpdate>,
        cancellation_token: CancellationToken,
    ) -> Result<(), Report<KubernetesError>> {
        info!("Starting pod watcher");
        let client = kube_client::init_kube_client(self.kubeconfig.as_deref()).await?;
        loop {
            select! {
                _ = cancellation_token.cancelled() => {
                    info!("Pod watcher shutdown requested");
                    break;
                }
                result = self.watch_pods(&client, &update_sender) => {
                    match result {
                        Ok(()) if update_sender.is_closed() => break,
                        Ok(()) => {
                            warn!("Pod watch stream ended unexpectedly, restarting...");
                        }
                        Err(e) => {
                            error!("Pod watch failed: {e:?}");
                            // Wait before retrying
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Watch pods and forward updates.
    ///
    /// # Errors
    ///
    /// - [`KubernetesError::WatchFailed`] if the watch operation fails
    async fn watch_pods(
        &self,
        client: &Client,
        update_sender: &mpsc::Sender<PodUpdate>,
    ) -> Result<(), Report<KubernetesError>> {
        let api: Api<Pod> = match &self.namespace {
            Some(ns) => Api::namespaced(client.clone(), ns),
            None => Api::all(client.clone()),
        };

        let config = Config::default().fields(&format!("spec.nodeName={}", self.node_name));
        let mut stream = watcher(api, config).boxed();

        while let Some(event) = stream.next().await {
            let event = event.map_err(|e| {
                Report::new(KubernetesError::WatchFailed {
                    message: format!("Watch stream error: {e}"),
                })
            })?;

            for update in self.event_updates(event) {
                if update_sender.send(update).await.is_err() {
                    warn!("Pod update receiver dropped, stopping watch");
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    fn classify(&self, pod: &Pod) -> Option<PodUpdate> {
        match pod_update(pod, &self.classes) {
            Ok(update) => update,
            Err(e) => {
                error!("Failed to handle pod event: {e:?}");
                None
            }
        }
    }

    fn event_updates(&self, event: Event<Pod>) -> Vec<PodUpdate> {
        match event {
            Event::Applied(pod) => self.classify(&pod).into_iter().collect(),
            Event::Deleted(pod) => deleted_update(&pod, &self.classes).into_iter().collect(),
            Event::Restarted(pods) => {
                info!(pods = pods.len(), "Pod watch (re)started, replaying pods");
                let live = pods.iter().filter_map(pod_ref).collect();
                let mut replay: Vec<PodUpdate> =
                    pods.iter().filter_map(|pod| self.classify(pod)).collect();
                // Pods already holding devices go first so a pending pod can
                // never take a unit a running pod is using.
                replay.sort_by_key(replay_rank);
                std::iter::once(PodUpdate::Relisted { live })
                    .chain(replay)
                    .collect()
            }
        }
    }
}

fn replay_rank(update: &PodUpdate) -> u8 {
    match update {
        PodUpdate::Relisted { .. } => 0,
        PodUpdate::Running { .. } => 1,
        PodUpdate::Finished { .. } | PodUpdate::Deleted { .. } => 2,
        PodUpdate::Pending { .. } => 3,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use api_types::WorkloadPhase;
    use k8s_openapi::api::core::v1::Container;
    use k8s_openapi::api::core::v1::PodSpec;
    use k8s_openapi::api::core::v1::PodStatus;
    use k8s_openapi::api::core::v1::ResourceRequirements;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use similar_asserts::assert_eq;

    use super::*;
    use crate::domain::admission::AdmissionController;
    use crate::domain::pool::ClassInventory;
    use crate::domain::pool::ResourcePool;
    use crate::infrastructure::k8s::PodLifecycle;

    fn watcher() -> PodWatcher {
        PodWatcher::new(
            None,
            None,
            "test-node".to_string(),
            vec!["nvidia.com/gpu".to_string()],
        )
    }

    fn create_test_pod(name: &str, gpus: Option<&str>, phase: &str) -> Pod {
        let resources = gpus.map(|gpus| ResourceRequirements {
            limits: Some(BTreeMap::from([(
                "nvidia.com/gpu".to_string(),
                Quantity(gpus.to_string()),
            )])),
            ..Default::default()
        });
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                uid: Some(format!("{name}-uid")),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "main".to_string(),
                    resources,
                    ..Default::default()
                }],
                ..Default::default()
            }),
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn applied_gpu_pod_is_forwarded() {
        let updates = watcher().event_updates(Event::Applied(create_test_pod(
            "cuda-vectoradd",
            Some("1"),
            "Pending",
        )));
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0], PodUpdate::Pending { .. }));
    }

    #[test]
    fn pod_without_gpus_is_dropped() {
        let pod = create_test_pod("nginx", None, "Pending");
        assert!(watcher().event_updates(Event::Applied(pod)).is_empty());

        let pod = create_test_pod("nginx", None, "Running");
        assert!(watcher().event_updates(Event::Deleted(pod)).is_empty());
    }

    #[test]
    fn invalid_quantity_is_dropped() {
        let updates = watcher().event_updates(Event::Applied(create_test_pod(
            "broken",
            Some("half"),
            "Pending",
        )));
        assert!(updates.is_empty());
    }

    #[test]
    fn deleted_event_releases() {
        let updates = watcher().event_updates(Event::Deleted(create_test_pod(
            "cuda-vectoradd",
            Some("1"),
            "Running",
        )));
        assert!(matches!(updates.as_slice(), [PodUpdate::Deleted { .. }]));
    }

    #[test]
    fn restart_relists_then_replays() {
        let updates = watcher().event_updates(Event::Restarted(vec![
            create_test_pod("success", Some("1"), "Running"),
            create_test_pod("nginx", None, "Running"),
        ]));

        assert_eq!(updates.len(), 2);
        match &updates[0] {
            PodUpdate::Relisted { live } => {
                let names: Vec<&str> = live.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["success", "nginx"]);
            }
            other => panic!("Expected Relisted, got {other:?}"),
        }
        assert!(matches!(updates[1], PodUpdate::Running { .. }));
    }

    #[test_log::test]
    fn restart_replays_running_pods_before_pending_ones() {
        let updates = watcher().event_updates(Event::Restarted(vec![
            create_test_pod("a-new", Some("1"), "Pending"),
            create_test_pod("b-holder", Some("1"), "Running"),
            create_test_pod("c-done", Some("1"), "Succeeded"),
        ]));

        let order: Vec<(&str, &str)> = updates
            .iter()
            .map(|update| {
                let kind = match update {
                    PodUpdate::Relisted { .. } => "relisted",
                    PodUpdate::Running { .. } => "running",
                    PodUpdate::Finished { .. } => "finished",
                    PodUpdate::Deleted { .. } => "deleted",
                    PodUpdate::Pending { .. } => "pending",
                };
                (kind, update.pod().map_or("", |p| p.name.as_str()))
            })
            .collect();
        assert_eq!(
            order,
            vec![
                ("relisted", ""),
                ("running", "b-holder"),
                ("finished", "c-done"),
                ("pending", "a-new"),
            ]
        );

        // The pod using the only GPU keeps it; the pending one is rejected.
        let pool = ResourcePool::from_inventory(vec![ClassInventory::with_count(
            "nvidia.com/gpu",
            1,
        )])
        .unwrap();
        let controller = Arc::new(AdmissionController::new(pool));
        let mut lifecycle = PodLifecycle::new(controller.clone());
        let rejections: Vec<_> = updates
            .into_iter()
            .filter_map(|update| lifecycle.apply(update))
            .collect();

        let phase = |name: &str| {
            let pod = pod_ref(&create_test_pod(name, Some("1"), "Pending")).unwrap();
            controller.workload(pod.workload_id().as_str()).map(|s| s.phase)
        };
        assert_eq!(phase("b-holder"), Some(WorkloadPhase::Running));
        assert_eq!(phase("a-new"), Some(WorkloadPhase::Rejected));
        assert_eq!(rejections.len(), 1);
        assert_eq!(rejections[0].pod.name, "a-new");
    }
}
