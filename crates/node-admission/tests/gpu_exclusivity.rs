use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;
use std::thread;

use api_types::AdmissionDecision;
use api_types::ResourceRequest;
use api_types::WorkloadPhase;
use node_admission::admission::AdmissionController;
use node_admission::discovery::InventoryDiscovery;
use node_admission::k8s::PodLifecycle;
use node_admission::k8s::PodRef;
use node_admission::k8s::PodUpdate;
use similar_asserts::assert_eq;
use tempfile::NamedTempFile;

const GPU: &str = "nvidia.com/gpu";

const INVENTORY: &str = r#"
classes:
  - name: nvidia.com/gpu
    devices:
      - index: 0
        id: GPU-a
        devicePath: /dev/nvidia0
      - index: 1
        id: GPU-b
        devicePath: /dev/nvidia1
"#;

fn controller_from_inventory() -> AdmissionController {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(INVENTORY.as_bytes()).unwrap();
    let discovery = InventoryDiscovery::new(file.path());
    AdmissionController::discover(&discovery).unwrap()
}

fn gpus(units: u64) -> ResourceRequest {
    ResourceRequest::from([(GPU.to_string(), units)])
}

fn pod(name: &str) -> PodRef {
    PodRef {
        namespace: "default".to_string(),
        name: name.to_string(),
        uid: format!("{name}-uid"),
    }
}

#[test]
fn exhausted_pool_rejects_until_release() {
    let controller = controller_from_inventory();

    let first = controller.admit("train-a", &gpus(2)).unwrap();
    let AdmissionDecision::Accepted { devices } = first else {
        panic!("expected the first request to be accepted");
    };
    let ids: Vec<&str> = devices[GPU].iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["GPU-a", "GPU-b"]);
    assert_eq!(controller.available(GPU), 0);

    let second = controller.admit("train-b", &gpus(1)).unwrap();
    assert_eq!(second.exhausted_classes().to_vec(), vec![GPU.to_string()]);
    assert_eq!(
        controller.workload("train-b").unwrap().phase,
        WorkloadPhase::Rejected
    );

    controller.mark_running("train-a").unwrap();
    assert_eq!(controller.mark_terminated("train-a", false).unwrap(), 2);
    assert_eq!(controller.available(GPU), 2);

    // Resubmitting the rejected workload is a new instance
    let retry = controller.admit("train-b", &gpus(1)).unwrap();
    assert!(retry.is_accepted());
    let status = controller.workload("train-b").unwrap();
    assert_eq!(status.phase, WorkloadPhase::Admitted);
    assert_eq!(status.devices[GPU][0].id, "GPU-a");

    let stats = controller.stats();
    assert_eq!((stats.admitted, stats.rejected, stats.released), (2, 1, 1));
}

#[test]
fn concurrent_admissions_never_share_a_unit() {
    let controller = Arc::new(controller_from_inventory());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let controller = controller.clone();
            thread::spawn(move || {
                let id = format!("worker-{i}");
                (id.clone(), controller.admit(id, &gpus(1)).unwrap())
            })
        })
        .collect();

    let mut granted = BTreeSet::new();
    let mut accepted = 0;
    for handle in handles {
        let (_id, decision) = handle.join().unwrap();
        if let AdmissionDecision::Accepted { devices } = decision {
            accepted += 1;
            for grant in &devices[GPU] {
                assert!(granted.insert(grant.index), "unit {} granted twice", grant.index);
            }
        }
    }

    assert_eq!(accepted, 2);
    assert_eq!(controller.available(GPU), 0);
    for unit in 0..2 {
        assert!(controller.holder_of(GPU, unit).is_some());
    }
}

#[test_log::test]
fn pod_lifecycle_rejects_then_admits_after_deletion() {
    let controller = Arc::new(controller_from_inventory());
    let mut lifecycle = PodLifecycle::new(controller.clone());

    let big = pod("big");
    assert!(lifecycle
        .apply(PodUpdate::Pending {
            pod: big.clone(),
            request: gpus(2),
        })
        .is_none());
    lifecycle.apply(PodUpdate::Running {
        pod: big.clone(),
        request: gpus(2),
    });

    let small = pod("small");
    let rejection = lifecycle
        .apply(PodUpdate::Pending {
            pod: small.clone(),
            request: gpus(1),
        })
        .expect("small pod should be rejected");
    assert_eq!(rejection.pod, small);
    assert_eq!(rejection.exhausted_classes, vec![GPU.to_string()]);

    lifecycle.apply(PodUpdate::Deleted { pod: big.clone() });
    assert_eq!(controller.available(GPU), 2);
    assert!(controller.workload(big.workload_id().as_str()).is_none());

    // A re-created pod carries a new uid and is a fresh workload
    let recreated = PodRef {
        uid: "small-uid-2".to_string(),
        ..small
    };
    assert!(lifecycle
        .apply(PodUpdate::Pending {
            pod: recreated.clone(),
            request: gpus(1),
        })
        .is_none());
    assert_eq!(
        controller
            .workload(recreated.workload_id().as_str())
            .unwrap()
            .phase,
        WorkloadPhase::Admitted
    );
    assert_eq!(controller.available(GPU), 1);
}

#[test_log::test]
fn relist_releases_pods_deleted_while_unwatched() {
    let controller = Arc::new(controller_from_inventory());
    let mut lifecycle = PodLifecycle::new(controller.clone());

    for name in ["kept", "lost"] {
        lifecycle.apply(PodUpdate::Pending {
            pod: pod(name),
            request: gpus(1),
        });
    }
    assert_eq!(controller.available(GPU), 0);

    lifecycle.apply(PodUpdate::Relisted {
        live: vec![pod("kept")],
    });

    assert_eq!(lifecycle.tracked(), 1);
    assert_eq!(controller.available(GPU), 1);
    assert!(controller
        .workload(pod("lost").workload_id().as_str())
        .is_none());
}
