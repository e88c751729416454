//! Command layer - Entry points for the admission controller operations

pub mod daemon;
pub mod local;
pub mod show_pool;

pub use daemon::run_daemon;
pub use local::run_local_mode;
pub use show_pool::run_show_pool;
