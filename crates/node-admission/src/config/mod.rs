pub mod cli;
pub mod daemon;
pub mod discovery;
pub mod inventory;
pub mod local;
pub mod runtime;

pub use cli::*;
pub use daemon::*;
pub use discovery::*;
pub use inventory::*;
pub use local::*;
pub use runtime::*;
