use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use tokio_util::sync::CancellationToken;

use crate::domain::admission::AdmissionController;

pub mod encoders;
use encoders::create_encoder;
use encoders::AdmissionMetricsParams;
use encoders::Encoder;
use encoders::MetricsEncoder as _;
use encoders::PoolMetricsParams;

/// Encode one snapshot of the pool and the admission counters
pub fn snapshot_lines(
    controller: &AdmissionController,
    node_name: &str,
    encoder: &Encoder,
    timestamp: i64,
) -> Vec<String> {
    let snapshot = controller.pool_snapshot();
    let stats = controller.stats();

    let mut lines: Vec<String> = snapshot
        .classes
        .iter()
        .map(|capacity| {
            encoder.encode_pool_metrics(&PoolMetricsParams {
                node_name,
                class: &capacity.class,
                total: capacity.total,
                available: capacity.available,
                timestamp,
            })
        })
        .collect();

    lines.push(encoder.encode_admission_metrics(&AdmissionMetricsParams {
        node_name,
        admitted: stats.admitted,
        rejected: stats.rejected,
        released: stats.released,
        timestamp,
    }));
    lines
}

/// Periodically write pool metrics until cancelled
pub async fn run_metrics(
    controller: Arc<AdmissionController>,
    node_name: String,
    interval: Duration,
    metrics_format: String,
    cancellation_token: CancellationToken,
) {
    let encoder = create_encoder(&metrics_format);
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                tracing::info!("Metrics collection shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                for line in snapshot_lines(&controller, &node_name, &encoder, current_time()) {
                    tracing::info!(
                        target: "metrics",
                        msg = %line,
                    );
                }
            }
        }
    }
}

pub fn current_time() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use api_types::ResourceRequest;
    use similar_asserts::assert_eq;

    use super::*;
    use crate::domain::pool::ClassInventory;
    use crate::domain::pool::ResourcePool;

    #[test]
    fn snapshot_has_one_line_per_class_plus_summary() {
        let pool = ResourcePool::from_inventory(vec![
            ClassInventory::with_count("nvidia.com/gpu", 2),
            ClassInventory::with_count("example.com/fpga", 1),
        ])
        .unwrap();
        let controller = AdmissionController::new(pool);
        controller
            .admit("w1", &ResourceRequest::from([("nvidia.com/gpu".to_string(), 1)]))
            .unwrap();

        let lines = snapshot_lines(&controller, "node-a", &create_encoder("influx"), 100);

        assert_eq!(lines.len(), 3);
        let gpu = lines
            .iter()
            .find(|l| l.contains("class=nvidia.com/gpu"))
            .unwrap();
        assert!(gpu.contains("reserved=1u"));
        assert!(gpu.contains("available=1u"));
        assert!(lines[2].starts_with("admission,node=node-a admitted=1u"));
    }
}
