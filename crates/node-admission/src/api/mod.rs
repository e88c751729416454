//! HTTP API for driving and inspecting the admission controller
//!
//! Lets a runtime without a Kubernetes integration submit and release
//! workloads, and lets operators inspect node capacity.
//!
//! # API Endpoints
//!
//! - `GET /api/v1/pool` - capacity of every resource class
//! - `POST /api/v1/workloads` - admit a workload (`{"workload_id", "request"}`)
//! - `GET /api/v1/workloads/{id}` - workload phase and granted devices
//! - `POST /api/v1/workloads/{id}/running` - mark an admitted workload running
//! - `DELETE /api/v1/workloads/{id}` - release a workload's units
//!
//! Every response uses the `{ "success", "data", "message" }` envelope.

pub mod errors;
pub mod handlers;
pub mod server;

pub use errors::ApiError;
pub use server::routes;
pub use server::ApiServer;
