use anyhow::Result;

use crate::app::services::ApplicationServices;
use crate::app::tasks::Tasks;
use crate::config::RuntimeConfig;

/// Application core structure with explicit dependencies
pub struct Application {
    services: ApplicationServices,
    config: RuntimeConfig,
}

impl Application {
    pub fn new(services: ApplicationServices, config: RuntimeConfig) -> Self {
        Self { services, config }
    }

    pub fn services(&self) -> &ApplicationServices {
        &self.services
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Run application, start all tasks and wait for completion
    pub async fn run(&self) -> Result<()> {
        tracing::info!("Starting all application tasks...");

        let mut tasks = Tasks::new();
        tasks.spawn_all_tasks(self);

        if let Err(e) = tasks.wait_for_completion().await {
            tracing::error!("Error during task execution: {}", e);
            return Err(e);
        }

        tracing::info!("Application run completed");
        Ok(())
    }

    /// Gracefully shutdown application
    pub async fn shutdown(&self) -> Result<()> {
        let stats = self.services.controller.stats();
        tracing::info!(
            admitted = stats.admitted,
            rejected = stats.rejected,
            released = stats.released,
            "Application shutdown completed"
        );
        Ok(())
    }
}
