use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::ApiServer;
use crate::app::core::Application;
use crate::app::services::KubernetesServices;
use crate::domain::admission::AdmissionController;
use crate::infrastructure::k8s::PodLifecycle;
use crate::infrastructure::k8s::PodStatusReporter;
use crate::infrastructure::k8s::PodUpdate;
use crate::infrastructure::metrics;

/// Task manager, responsible for starting and managing all background tasks
pub struct Tasks {
    pub tasks: Vec<JoinHandle<()>>,
    cancellation_token: CancellationToken,
}

impl Default for Tasks {
    fn default() -> Self {
        Self::new()
    }
}

impl Tasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start all background tasks
    pub fn spawn_all_tasks(&mut self, app: &Application) {
        if let Some(metrics_task) = self.spawn_metrics_task(app) {
            self.tasks.push(metrics_task);
        }

        if let Some(k8s) = &app.services().kubernetes {
            let (k8s_update_sender, k8s_update_receiver) = mpsc::channel::<PodUpdate>(32);

            let k8s_task = self.spawn_k8s_watcher_task(k8s, k8s_update_sender);
            self.tasks.push(k8s_task);

            let k8s_processor_task = self.spawn_k8s_processor_task(
                k8s_update_receiver,
                app.services().controller.clone(),
                k8s.status_reporter.clone(),
            );
            self.tasks.push(k8s_processor_task);
        }

        let api_server_task = self.spawn_api_server_task(app);
        self.tasks.push(api_server_task);
    }

    /// wait for tasks to complete or receive shutdown signal
    pub async fn wait_for_completion(&mut self) -> Result<()> {
        let signal_handler = {
            use tokio::signal::unix::signal;
            use tokio::signal::unix::SignalKind;
            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;

            tokio::spawn(async move {
                tokio::select! {
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    }
                    _ = sigint.recv() => {
                        tracing::info!("Received SIGINT, initiating graceful shutdown");
                    }
                }
            })
        };

        tokio::select! {
            _ = signal_handler => {
                tracing::info!("Shutdown signal received, cancelling all tasks");
                self.cancellation_token.cancel();
                self.wait_for_tasks_with_timeout(Duration::from_secs(30)).await;
            }
            // Any task ending on its own is unexpected
            result = futures::future::select_all(&mut self.tasks) => {
                let (result, _index, _remaining) = result;
                self.cancellation_token.cancel();
                if let Err(e) = result {
                    tracing::error!("Task completed with error: {e}");
                    return Err(e.into());
                }
                tracing::warn!("Task completed unexpectedly");
            }
        }

        Ok(())
    }

    async fn wait_for_tasks_with_timeout(&mut self, timeout: Duration) {
        tokio::time::timeout(timeout, async {
            for task in &mut self.tasks {
                if let Err(e) = task.await {
                    tracing::error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await
        .unwrap_or_else(|_| {
            tracing::warn!("Task shutdown timed out after {:?}", timeout);
        });
    }

    fn spawn_metrics_task(&self, app: &Application) -> Option<JoinHandle<()>> {
        let config = app.config();
        let metrics_config = config.metrics.clone()?;
        let controller = app.services().controller.clone();
        let node_name = config.node_name.clone();
        let token = self.cancellation_token.clone();

        Some(tokio::spawn(async move {
            tracing::info!("Starting metrics collection task");
            metrics::run_metrics(
                controller,
                node_name,
                metrics_config.interval,
                metrics_config.format,
                token,
            )
            .await;
            tracing::info!("Metrics collection task completed");
        }))
    }

    fn spawn_k8s_watcher_task(
        &self,
        k8s: &KubernetesServices,
        k8s_update_sender: mpsc::Sender<PodUpdate>,
    ) -> JoinHandle<()> {
        let token = self.cancellation_token.clone();
        let pod_watcher = k8s.pod_watcher.clone();
        tokio::spawn(async move {
            tracing::info!("Starting Kubernetes pod watcher task");
            if let Err(e) = pod_watcher.run(k8s_update_sender, token).await {
                tracing::error!("Kubernetes pod watcher failed: {e:?}");
            } else {
                tracing::info!("Kubernetes pod watcher completed");
            }
        })
    }

    fn spawn_api_server_task(&self, app: &Application) -> JoinHandle<()> {
        let listen_addr = app.config().api_listen_addr.clone();
        let controller = app.services().controller.clone();
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            let api_server = ApiServer::new(controller, listen_addr);
            if let Err(e) = api_server.run(token).await {
                tracing::error!("API server failed: {e:?}");
            } else {
                tracing::info!("API server completed");
            }
        })
    }

    fn spawn_k8s_processor_task(
        &self,
        mut k8s_update_receiver: mpsc::Receiver<PodUpdate>,
        controller: Arc<AdmissionController>,
        status_reporter: PodStatusReporter,
    ) -> JoinHandle<()> {
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            tracing::info!("Starting Kubernetes update processor task");
            let mut lifecycle = PodLifecycle::new(controller);
            loop {
                tokio::select! {
                    update = k8s_update_receiver.recv() => {
                        let Some(update) = update else {
                            tracing::info!("Kubernetes update receiver closed");
                            break;
                        };
                        let Some(rejection) = lifecycle.apply(update) else {
                            continue;
                        };
                        if let Err(e) = status_reporter
                            .report_rejected(&rejection.pod, &rejection.exhausted_classes)
                            .await
                        {
                            tracing::error!("Failed to report pod rejection: {e:?}");
                        }
                    }
                    _ = token.cancelled() => {
                        tracing::info!("Kubernetes update processor task cancelled");
                        break;
                    }
                }
            }
        })
    }
}
