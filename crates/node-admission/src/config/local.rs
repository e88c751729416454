use std::path::PathBuf;

use clap::Args;

use super::discovery::DiscoveryArgs;

/// Arguments for running without Kubernetes; workloads come in over HTTP
#[derive(Args, Debug, Clone)]
pub struct LocalArgs {
    #[command(flatten)]
    pub discovery: DiscoveryArgs,

    /// HTTP API server listen address
    #[arg(long, default_value = "127.0.0.1:8001")]
    pub api_listen_addr: String,

    /// Node name used in metrics
    #[arg(long, default_value = "local")]
    pub node_name: String,

    /// Write resource pool metrics to this file
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub metrics_file: Option<PathBuf>,

    /// Seconds between two resource pool snapshots
    #[arg(long, default_value = "10")]
    pub metrics_interval_secs: u64,
}

/// Arguments for printing the discovered pool
#[derive(Args, Debug, Clone)]
pub struct ShowPoolArgs {
    #[command(flatten)]
    pub discovery: DiscoveryArgs,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}
