use std::path::PathBuf;

use clap::Parser;

use super::discovery::DiscoveryArgs;

#[derive(Parser, Debug, Clone)]
pub struct DaemonArgs {
    #[arg(
        long,
        env = "NODE_NAME",
        help = "Node name for filtering pods to this node only"
    )]
    pub node_name: String,

    #[arg(
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to kubeconfig file (defaults to cluster config or ~/.kube/config)"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(
        long,
        help = "Kubernetes namespace to monitor (empty for all namespaces)"
    )]
    pub k8s_namespace: Option<String>,

    #[arg(
        long,
        help = "Enable Kubernetes pod monitoring",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub enable_k8s: bool,

    #[command(flatten)]
    pub discovery: DiscoveryArgs,

    #[arg(
        long,
        env = "API_LISTEN_ADDR",
        default_value = "0.0.0.0:8001",
        help = "HTTP API server listen address"
    )]
    pub api_listen_addr: String,

    #[arg(
        long,
        help = "Enable metrics collection",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub enable_metrics: bool,

    #[arg(
        long,
        env = "METRICS_FILE",
        value_hint = clap::ValueHint::FilePath,
        default_value = "/logs/metrics.log",
        help = "Path for printing resource pool metrics, e.g. /logs/metrics.log"
    )]
    pub metrics_file: Option<PathBuf>,

    #[arg(
        long,
        default_value = "10",
        help = "Seconds between two resource pool snapshots"
    )]
    pub metrics_interval_secs: u64,

    #[arg(
        long,
        env = "METRICS_FORMAT",
        default_value = "influx",
        help = "Metrics format, either 'influx' or 'json'"
    )]
    pub metrics_format: String,
}
