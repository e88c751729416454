//! Application module
//!
//! Wires discovery, the admission controller and its runtime integrations
//! into one running process.

pub mod builder;
pub mod core;
pub mod services;
pub mod tasks;

pub use builder::discover_pool;
pub use builder::ApplicationBuilder;
pub use core::Application;
pub use services::ApplicationServices;
