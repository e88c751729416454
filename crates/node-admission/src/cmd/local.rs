use anyhow::Result;
use utils::version;

use crate::app::ApplicationBuilder;
use crate::config::LocalArgs;
use crate::config::RuntimeConfig;
use crate::infrastructure::logging;

/// Run without Kubernetes; workloads are submitted through the HTTP API
pub async fn run_local_mode(local_args: LocalArgs) -> Result<()> {
    let config = RuntimeConfig::from(local_args);
    let _guard = logging::init(config.metrics_file.as_deref())?;

    tracing::info!(
        node = %config.node_name,
        listen = %config.api_listen_addr,
        "Starting node admission in local mode {}",
        &**version::VERSION
    );

    let app = ApplicationBuilder::new(config).build().await?;

    app.run().await?;
    app.shutdown().await?;

    Ok(())
}
