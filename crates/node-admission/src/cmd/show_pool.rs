use anyhow::Context;
use anyhow::Result;

use crate::app::discover_pool;
use crate::config::ShowPoolArgs;

/// Discover devices once and print the resulting pool
pub async fn run_show_pool(args: ShowPoolArgs) -> Result<()> {
    utils::logging::init();

    let controller = discover_pool(&args.discovery).await?;
    let snapshot = controller.pool_snapshot();

    let output = if args.pretty {
        serde_json::to_string_pretty(&snapshot)
    } else {
        serde_json::to_string(&snapshot)
    }
    .context("failed to serialize pool snapshot")?;

    println!("{output}");
    Ok(())
}
