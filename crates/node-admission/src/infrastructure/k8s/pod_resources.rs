//! Translation of pod objects into admission requests and lifecycle updates.

use api_types::ResourceRequest;
use error_stack::Report;
use k8s_openapi::api::core::v1::Container;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use super::types::KubernetesError;
use super::types::PodRef;
use super::types::PodUpdate;

/// Parse an extended-resource quantity. Extended resources only accept whole
/// numbers, optionally with a decimal SI suffix.
pub fn parse_units(class: &str, quantity: &Quantity) -> Result<u64, Report<KubernetesError>> {
    let invalid = || {
        Report::new(KubernetesError::InvalidQuantity {
            class: class.to_string(),
            value: quantity.0.clone(),
        })
    };

    let value = quantity.0.trim();
    let (digits, multiplier) = match value.char_indices().last() {
        Some((i, 'k')) => (&value[..i], 1_000),
        Some((i, 'M')) => (&value[..i], 1_000_000),
        Some((i, 'G')) => (&value[..i], 1_000_000_000),
        _ => (value, 1),
    };

    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(invalid)
}

/// Units of `class` one container asks for; limits win over requests
fn container_units(container: &Container, class: &str) -> Result<u64, Report<KubernetesError>> {
    let Some(resources) = container.resources.as_ref() else {
        return Ok(0);
    };
    let quantity = resources
        .limits
        .as_ref()
        .and_then(|limits| limits.get(class))
        .or_else(|| resources.requests.as_ref().and_then(|r| r.get(class)));

    match quantity {
        Some(quantity) => parse_units(class, quantity),
        None => Ok(0),
    }
}

/// Effective request of a pod over the given classes.
///
/// App containers run together, so their units add up. Init containers run
/// one at a time before them, so the pod needs the larger of the two.
pub fn pod_request(
    pod: &Pod,
    classes: &[String],
) -> Result<ResourceRequest, Report<KubernetesError>> {
    let mut request = ResourceRequest::new();
    let Some(spec) = pod.spec.as_ref() else {
        return Ok(request);
    };

    for class in classes {
        let mut app_units = 0u64;
        for container in &spec.containers {
            app_units = app_units.saturating_add(container_units(container, class)?);
        }

        let mut init_units = 0u64;
        for container in spec.init_containers.iter().flatten() {
            init_units = init_units.max(container_units(container, class)?);
        }

        let units = app_units.max(init_units);
        if units > 0 {
            request.insert(class.clone(), units);
        }
    }
    Ok(request)
}

pub(crate) fn pod_ref(pod: &Pod) -> Option<PodRef> {
    let metadata = &pod.metadata;
    Some(PodRef {
        namespace: metadata
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string()),
        name: metadata.name.clone()?,
        uid: metadata.uid.clone()?,
    })
}

/// True when no container of the pod is running
fn containers_stopped(pod: &Pod) -> bool {
    let Some(status) = pod.status.as_ref() else {
        return true;
    };
    status
        .container_statuses
        .iter()
        .chain(status.init_container_statuses.iter())
        .flatten()
        .all(|container| {
            container
                .state
                .as_ref()
                .map_or(true, |state| state.running.is_none())
        })
}

/// Classify an added or modified pod.
///
/// Pods that ask for none of `classes` yield `None`.
pub fn pod_update(
    pod: &Pod,
    classes: &[String],
) -> Result<Option<PodUpdate>, Report<KubernetesError>> {
    let Some(pod_ref) = pod_ref(pod) else {
        tracing::debug!("Ignoring pod without name or uid");
        return Ok(None);
    };

    let request = pod_request(pod, classes)?;
    if request.is_empty() {
        return Ok(None);
    }

    // A terminating pod keeps its devices through the grace period, until
    // none of its containers runs any more.
    if pod.metadata.deletion_timestamp.is_some() && containers_stopped(pod) {
        return Ok(Some(PodUpdate::Deleted { pod: pod_ref }));
    }

    let phase = pod.status.as_ref().and_then(|status| status.phase.as_deref());
    let update = match phase {
        Some("Running") => PodUpdate::Running {
            pod: pod_ref,
            request,
        },
        Some("Succeeded") => PodUpdate::Finished {
            pod: pod_ref,
            failed: false,
        },
        Some("Failed") => PodUpdate::Finished {
            pod: pod_ref,
            failed: true,
        },
        // Pending, Unknown or not yet reported
        _ => PodUpdate::Pending {
            pod: pod_ref,
            request,
        },
    };
    Ok(Some(update))
}

/// Classify a pod removed from the API server
pub fn deleted_update(pod: &Pod, classes: &[String]) -> Option<PodUpdate> {
    let pod_ref = pod_ref(pod)?;
    match pod_request(pod, classes) {
        Ok(request) if request.is_empty() => None,
        // A pod we could not parse was never admitted; releasing is a no-op.
        _ => Some(PodUpdate::Deleted { pod: pod_ref }),
    }
}
