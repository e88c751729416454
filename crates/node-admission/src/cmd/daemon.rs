use anyhow::Result;
use utils::version;

use crate::app::ApplicationBuilder;
use crate::config::DaemonArgs;
use crate::config::RuntimeConfig;
use crate::infrastructure::logging;

pub async fn run_daemon(daemon_args: DaemonArgs) -> Result<()> {
    let config = RuntimeConfig::from(daemon_args);
    let _guard = logging::init(config.metrics_file.as_deref())?;

    tracing::info!("Starting node admission daemon {}", &**version::VERSION);

    let app = ApplicationBuilder::new(config).build().await?;

    app.run().await?;
    app.shutdown().await?;

    Ok(())
}
