use anyhow::Result;
use clap::Parser;

use node_admission::cmd::run_daemon;
use node_admission::cmd::run_local_mode;
use node_admission::cmd::run_show_pool;
use node_admission::config::Cli;
use node_admission::config::Commands;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon(daemon_args) => run_daemon(*daemon_args).await,
        Commands::Local(local_args) => run_local_mode(local_args).await,
        Commands::ShowPool(show_pool_args) => run_show_pool(show_pool_args).await,
    }
}
