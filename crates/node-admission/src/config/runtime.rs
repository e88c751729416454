use std::path::PathBuf;
use std::time::Duration;

use super::daemon::DaemonArgs;
use super::discovery::DiscoveryArgs;
use super::local::LocalArgs;

/// Where pods are watched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubernetesConfig {
    pub kubeconfig: Option<PathBuf>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    pub interval: Duration,
    pub format: String,
}

/// Settings the application is built from, whichever command started it
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub node_name: String,
    pub discovery: DiscoveryArgs,
    pub api_listen_addr: String,
    /// Pod watching; `None` when workloads only arrive over HTTP
    pub kubernetes: Option<KubernetesConfig>,
    pub metrics: Option<MetricsConfig>,
    pub metrics_file: Option<PathBuf>,
}

impl From<DaemonArgs> for RuntimeConfig {
    fn from(args: DaemonArgs) -> Self {
        let kubernetes = args.enable_k8s.then(|| KubernetesConfig {
            kubeconfig: args.kubeconfig.clone(),
            namespace: args.k8s_namespace.clone().filter(|ns| !ns.is_empty()),
        });
        let metrics = args.enable_metrics.then(|| MetricsConfig {
            interval: Duration::from_secs(args.metrics_interval_secs.max(1)),
            format: args.metrics_format.clone(),
        });

        Self {
            node_name: args.node_name,
            discovery: args.discovery,
            api_listen_addr: args.api_listen_addr,
            kubernetes,
            metrics,
            metrics_file: args.metrics_file,
        }
    }
}

impl From<LocalArgs> for RuntimeConfig {
    fn from(args: LocalArgs) -> Self {
        let metrics = args.metrics_file.as_ref().map(|_| MetricsConfig {
            interval: Duration::from_secs(args.metrics_interval_secs.max(1)),
            format: "influx".to_string(),
        });

        Self {
            node_name: args.node_name,
            discovery: args.discovery,
            api_listen_addr: args.api_listen_addr,
            kubernetes: None,
            metrics,
            metrics_file: args.metrics_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::config::DiscoveryKind;

    fn discovery() -> DiscoveryArgs {
        DiscoveryArgs {
            kind: DiscoveryKind::DevNodes,
            gpu_resource_name: "nvidia.com/gpu".to_string(),
            dev_dir: PathBuf::from("/dev"),
            inventory_path: None,
        }
    }

    fn daemon_args() -> DaemonArgs {
        DaemonArgs {
            node_name: "node-a".to_string(),
            kubeconfig: None,
            k8s_namespace: Some(String::new()),
            enable_k8s: true,
            discovery: discovery(),
            api_listen_addr: "0.0.0.0:8001".to_string(),
            enable_metrics: true,
            metrics_file: Some(PathBuf::from("/logs/metrics.log")),
            metrics_interval_secs: 0,
            metrics_format: "json".to_string(),
        }
    }

    #[test]
    fn daemon_args_to_config() {
        let config = RuntimeConfig::from(daemon_args());

        assert_eq!(config.node_name, "node-a");
        assert_eq!(
            config.kubernetes,
            Some(KubernetesConfig {
                kubeconfig: None,
                namespace: None,
            })
        );
        assert_eq!(
            config.metrics,
            Some(MetricsConfig {
                interval: Duration::from_secs(1),
                format: "json".to_string(),
            })
        );
    }

    #[test]
    fn disabled_features_are_none() {
        let args = DaemonArgs {
            enable_k8s: false,
            enable_metrics: false,
            ..daemon_args()
        };
        let config = RuntimeConfig::from(args);
        assert_eq!(config.kubernetes, None);
        assert_eq!(config.metrics, None);
    }

    #[test]
    fn local_args_never_watch_pods() {
        let config = RuntimeConfig::from(LocalArgs {
            discovery: discovery(),
            api_listen_addr: "127.0.0.1:9000".to_string(),
            node_name: "local".to_string(),
            metrics_file: None,
            metrics_interval_secs: 10,
        });

        assert_eq!(config.kubernetes, None);
        assert_eq!(config.metrics, None);
        assert_eq!(config.api_listen_addr, "127.0.0.1:9000");
    }
}
