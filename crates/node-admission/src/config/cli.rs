use clap::Parser;
use clap::Subcommand;
use utils::version;

use crate::config::daemon::DaemonArgs;
use crate::config::local::LocalArgs;
use crate::config::local::ShowPoolArgs;

#[derive(Parser)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the node admission daemon
    Daemon(Box<DaemonArgs>),
    /// Run admission with its HTTP API only, without Kubernetes
    Local(LocalArgs),
    /// Discover node devices and print the resource pool
    #[command(name = "show-pool")]
    ShowPool(ShowPoolArgs),
}
