use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;

use crate::app::core::Application;
use crate::app::services::ApplicationServices;
use crate::app::services::KubernetesServices;
use crate::config::DiscoveryArgs;
use crate::config::KubernetesConfig;
use crate::config::RuntimeConfig;
use crate::domain::admission::AdmissionController;
use crate::infrastructure::discovery;
use crate::infrastructure::k8s::PodStatusReporter;
use crate::infrastructure::k8s::PodWatcher;
use crate::infrastructure::kube_client;

/// Application builder
pub struct ApplicationBuilder {
    config: RuntimeConfig,
}

impl ApplicationBuilder {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    /// Build complete application
    pub async fn build(self) -> Result<Application> {
        tracing::info!("Building application components...");

        let controller = Arc::new(discover_pool(&self.config.discovery).await?);

        let kubernetes = match &self.config.kubernetes {
            Some(k8s) => Some(self.create_kubernetes_services(k8s, &controller).await?),
            None => {
                tracing::info!("Kubernetes disabled, workloads are driven through the API only");
                None
            }
        };

        let services = ApplicationServices {
            controller,
            kubernetes,
        };

        Ok(Application::new(services, self.config))
    }

    async fn create_kubernetes_services(
        &self,
        k8s: &KubernetesConfig,
        controller: &AdmissionController,
    ) -> Result<KubernetesServices> {
        let client = kube_client::init_kube_client(k8s.kubeconfig.as_deref())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize Kubernetes client: {e:?}"))?;

        let pod_watcher = Arc::new(PodWatcher::new(
            k8s.kubeconfig.clone(),
            k8s.namespace.clone(),
            self.config.node_name.clone(),
            controller.classes(),
        ));

        Ok(KubernetesServices {
            pod_watcher,
            status_reporter: PodStatusReporter::new(client),
        })
    }
}

/// Run device discovery off the async runtime and build the controller
pub async fn discover_pool(args: &DiscoveryArgs) -> Result<AdmissionController> {
    let source = discovery::from_args(args)?;
    let source_name = source.name();

    let controller =
        tokio::task::spawn_blocking(move || AdmissionController::discover(source.as_ref()))
            .await
            .context("device discovery task failed")?
            .with_context(|| format!("device discovery via {source_name} failed"))?;

    for class in controller.pool_snapshot().classes {
        tracing::info!(
            class = %class.class,
            total = class.total,
            "Resource class ready"
        );
    }
    Ok(controller)
}
