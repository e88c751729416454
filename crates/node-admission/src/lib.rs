pub mod api;
pub mod app;
pub mod cmd;
pub mod config;
pub mod domain;
mod infrastructure;

// Re-export main modules
pub use domain::admission;
pub use domain::allocation;
pub use domain::lifecycle;
pub use domain::pool;
pub use infrastructure::discovery;
pub use infrastructure::k8s;
pub use infrastructure::kube_client;
pub use infrastructure::logging;
pub use infrastructure::metrics;
