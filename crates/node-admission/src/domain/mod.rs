//! Core admission domain: resource pool, allocation tracking, admission
//! control and the per-workload lifecycle.

pub mod admission;
pub mod allocation;
pub mod lifecycle;
pub mod pool;
