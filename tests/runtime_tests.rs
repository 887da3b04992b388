use std::collections::HashSet;
use std::sync::Arc;

use cluster_sim::config::{RuntimeConfig, RuntimeKind};
use cluster_sim::runtime::{self, ContainerRuntime, DockerRuntime, SimulatedRuntime};
use cluster_sim::ClusterError;

#[tokio::test]
async fn test_simulated_handles_are_unique() {
    let runtime = SimulatedRuntime::new();

    let mut handles = HashSet::new();
    for i in 0..100 {
        let id = runtime.create(&format!("node-{}", i)).await.unwrap();
        assert!(id.starts_with("sim-"));
        handles.insert(id);
    }

    assert_eq!(handles.len(), 100);
}

#[tokio::test]
async fn test_simulated_records_teardown_in_order() {
    let runtime = SimulatedRuntime::new();
    let a = runtime.create("node-1").await.unwrap();
    let b = runtime.create("node-2").await.unwrap();

    runtime.teardown(&b).await.unwrap();
    runtime.teardown(&a).await.unwrap();

    assert_eq!(runtime.torn_down(), vec![b, a]);
}

#[tokio::test]
async fn test_simulated_rejects_creates_on_demand() {
    let runtime = SimulatedRuntime::new();
    runtime.reject_creates(true);

    let err = runtime.create("node-1").await.unwrap_err();
    assert!(matches!(err, ClusterError::Runtime(ref msg) if msg.contains("node-1")));

    runtime.reject_creates(false);
    assert!(runtime.create("node-1").await.is_ok());
}

#[tokio::test]
async fn test_from_config_selects_simulated() {
    let runtime: Arc<dyn ContainerRuntime> = runtime::from_config(&RuntimeConfig::simulated());
    let id = runtime.create("node-1").await.unwrap();
    assert!(id.starts_with("sim-"));
}

#[test]
fn test_default_runtime_config_targets_docker() {
    let config = RuntimeConfig::default();
    assert_eq!(config.kind, RuntimeKind::Docker);
    assert_eq!(config.image, "alpine");
    assert_eq!(config.label, "cluster-sim=true");
}

// Needs a local Docker daemon: cargo test -- --ignored
#[tokio::test]
#[ignore]
async fn test_docker_container_lifecycle() {
    let runtime = DockerRuntime::new(RuntimeConfig::default());
    let name = format!("cluster-sim-test-{}", uuid::Uuid::new_v4().simple());

    let container_id = runtime.create(&name).await.unwrap();
    assert!(!container_id.is_empty());

    runtime.teardown(&container_id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_docker_missing_image_is_runtime_error() {
    let runtime = DockerRuntime::new(RuntimeConfig {
        image: "cluster-sim/does-not-exist:never".to_string(),
        ..RuntimeConfig::default()
    });

    assert!(matches!(
        runtime.create("cluster-sim-missing-image").await,
        Err(ClusterError::Runtime(_))
    ));
}
