use error_stack::Report;
use error_stack::ResultExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::Patch;
use kube::api::PatchParams;
use kube::Api;
use kube::Client;
use serde_json::json;

use super::types::KubernetesError;
use super::types::PodRef;

/// Status patch marking a pod rejected for lack of `exhausted_classes`.
///
/// Follows the kubelet convention of an `OutOf<resource>` reason naming the
/// first exhausted class.
pub fn rejection_status(exhausted_classes: &[String]) -> serde_json::Value {
    let reason = match exhausted_classes.first() {
        Some(class) => format!("OutOf{class}"),
        None => "OutOfResources".to_string(),
    };
    json!({
        "status": {
            "phase": "Failed",
            "reason": reason,
            "message": format!(
                "Pod was rejected: Node didn't have enough resource: {}",
                exhausted_classes.join(", ")
            ),
        }
    })
}

/// Writes admission outcomes back to pod status
#[derive(Clone)]
pub struct PodStatusReporter {
    client: Client,
}

impl PodStatusReporter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Mark `pod` as failed because `exhausted_classes` had no free units.
    ///
    /// # Errors
    ///
    /// - [`KubernetesError::StatusPatchFailed`] if the API server refuses the patch
    pub async fn report_rejected(
        &self,
        pod: &PodRef,
        exhausted_classes: &[String],
    ) -> Result<(), Report<KubernetesError>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &pod.namespace);
        let patch = rejection_status(exhausted_classes);

        api.patch_status(&pod.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .change_context(KubernetesError::StatusPatchFailed {
                pod_name: pod.name.clone(),
                namespace: pod.namespace.clone(),
            })?;

        tracing::info!(
            namespace = %pod.namespace,
            pod_name = %pod.name,
            "Reported pod rejection"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn rejection_names_exhausted_class() {
        let status = rejection_status(&["nvidia.com/gpu".to_string()]);
        assert_eq!(
            status,
            json!({
                "status": {
                    "phase": "Failed",
                    "reason": "OutOfnvidia.com/gpu",
                    "message": "Pod was rejected: Node didn't have enough resource: nvidia.com/gpu",
                }
            })
        );
    }
}
