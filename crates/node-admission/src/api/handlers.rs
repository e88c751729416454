use std::sync::Arc;

use api_types::AdmitRequest;
use api_types::AdmitResponse;
use api_types::ApiResponse;
use api_types::PoolResponse;
use api_types::ReleaseResponse;
use api_types::ReleaseResult;
use api_types::WorkloadResponse;
use poem::handler;
use poem::http::StatusCode;
use poem::web::Data;
use poem::web::Json;
use poem::web::Path;
use poem::IntoResponse;
use tracing::info;
use tracing::warn;

use crate::domain::admission::AdmissionController;
use crate::domain::admission::AdmissionError;
use crate::domain::lifecycle::LifecycleError;

/// Error statuses surfaced by the admission endpoints
fn status_of(error: &AdmissionError) -> StatusCode {
    match error {
        AdmissionError::WorkloadAlreadyActive { .. } => StatusCode::CONFLICT,
        AdmissionError::Lifecycle(LifecycleError::UnknownWorkload { .. }) => StatusCode::NOT_FOUND,
        AdmissionError::Lifecycle(_) => StatusCode::CONFLICT,
        AdmissionError::Allocation(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure<T: serde::Serialize + Send>(error: AdmissionError) -> poem::Response {
    let status = status_of(&error);
    Json(ApiResponse::<T>::failed(error.to_string()))
        .with_status(status)
        .into_response()
}

/// Current capacity of every resource class
#[handler]
pub async fn get_pool(controller: Data<&Arc<AdmissionController>>) -> Json<PoolResponse> {
    Json(ApiResponse::ok(
        controller.pool_snapshot(),
        "Resource pool retrieved successfully",
    ))
}

/// Admit a workload, reserving units for its whole request or none at all
#[handler]
pub async fn admit_workload(
    Json(body): Json<AdmitRequest>,
    controller: Data<&Arc<AdmissionController>>,
) -> poem::Response {
    if body.workload_id.trim().is_empty() {
        return Json(AdmitResponse::failed("workload_id must not be empty"))
            .with_status(StatusCode::BAD_REQUEST)
            .into_response();
    }

    match controller.admit(body.workload_id.as_str(), &body.request) {
        Ok(decision) => {
            let message = if decision.is_accepted() {
                format!("Workload {} admitted", body.workload_id)
            } else {
                format!(
                    "Workload {} rejected, exhausted: {}",
                    body.workload_id,
                    decision.exhausted_classes().join(", ")
                )
            };
            Json(AdmitResponse::ok(decision, message)).into_response()
        }
        Err(e) => {
            warn!(workload_id = %body.workload_id, "Admission failed: {e}");
            failure::<api_types::AdmissionDecision>(e)
        }
    }
}

/// Phase and granted devices of a workload
#[handler]
pub async fn get_workload(
    Path(workload_id): Path<String>,
    controller: Data<&Arc<AdmissionController>>,
) -> poem::Response {
    match controller.workload(&workload_id) {
        Some(status) => Json(WorkloadResponse::ok(
            status,
            format!("Workload {workload_id} information retrieved successfully"),
        ))
        .into_response(),
        None => Json(WorkloadResponse::failed(format!(
            "Workload {workload_id} not found"
        )))
        .with_status(StatusCode::NOT_FOUND)
        .into_response(),
    }
}

/// Record that an admitted workload started
#[handler]
pub async fn mark_running(
    Path(workload_id): Path<String>,
    controller: Data<&Arc<AdmissionController>>,
) -> poem::Response {
    let status = controller
        .mark_running(&workload_id)
        .map(|()| controller.workload(&workload_id));

    match status {
        Ok(Some(status)) => {
            Json(WorkloadResponse::ok(status, format!("Workload {workload_id} running")))
                .into_response()
        }
        // Forgotten concurrently
        Ok(None) => Json(WorkloadResponse::failed(format!(
            "Workload {workload_id} not found"
        )))
        .with_status(StatusCode::NOT_FOUND)
        .into_response(),
        Err(e) => failure::<api_types::WorkloadStatus>(e),
    }
}

/// Release whatever a workload holds and drop its record. Releasing twice
/// is a no-op.
#[handler]
pub async fn release_workload(
    Path(workload_id): Path<String>,
    controller: Data<&Arc<AdmissionController>>,
) -> poem::Response {
    match controller.forget(&workload_id) {
        Ok(released_units) => {
            info!(workload_id = %workload_id, released_units, "Released via API");
            Json(ReleaseResponse::ok(
                ReleaseResult {
                    workload_id: workload_id.clone(),
                    released_units,
                },
                format!("Workload {workload_id} released"),
            ))
            .into_response()
        }
        Err(e) => failure::<ReleaseResult>(e),
    }
}
