use std::sync::Arc;

use error_stack::Report;
use poem::get;
use poem::listener::TcpListener;
use poem::middleware::Tracing;
use poem::post;
use poem::Endpoint;
use poem::EndpointExt;
use poem::Route;
use poem::Server;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;

use super::errors::ApiError;
use super::handlers::admit_workload;
use super::handlers::get_pool;
use super::handlers::get_workload;
use super::handlers::mark_running;
use super::handlers::release_workload;
use crate::domain::admission::AdmissionController;

/// Routes of the admission API, bound to `controller`
pub fn routes(controller: Arc<AdmissionController>) -> impl Endpoint {
    Route::new()
        .at("/api/v1/pool", get(get_pool))
        .at("/api/v1/workloads", post(admit_workload))
        .at(
            "/api/v1/workloads/:workload_id",
            get(get_workload).delete(release_workload),
        )
        .at("/api/v1/workloads/:workload_id/running", post(mark_running))
        .data(controller)
        .with(Tracing)
}

/// HTTP API server exposing the admission controller
pub struct ApiServer {
    controller: Arc<AdmissionController>,
    listen_addr: String,
}

impl ApiServer {
    pub fn new(controller: Arc<AdmissionController>, listen_addr: String) -> Self {
        Self {
            controller,
            listen_addr,
        }
    }

    /// Start the API server
    ///
    /// # Errors
    ///
    /// - [`ApiError::ServerError`] if the server fails to start or bind to the address
    pub async fn run(self, cancellation_token: CancellationToken) -> Result<(), Report<ApiError>> {
        info!("Starting HTTP API server on {}", self.listen_addr);

        let app = routes(self.controller);
        let listener = TcpListener::bind(&self.listen_addr);
        let server = Server::new(listener);

        tokio::select! {
            result = server.run(app) => {
                match result {
                    Ok(()) => {
                        info!("API server stopped normally");
                        Ok(())
                    }
                    Err(e) => {
                        error!("API server failed: {e}");
                        Err(Report::new(ApiError::ServerError {
                            message: format!("Server failed: {e}"),
                        }))
                    }
                }
            }
            _ = cancellation_token.cancelled() => {
                info!("API server shutdown requested");
                Ok(())
            }
        }
    }
}
