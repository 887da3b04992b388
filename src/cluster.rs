use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::{ClusterError, Result};
use crate::registry::node::require_positive;
use crate::registry::{Node, NodeRegistry, NodeStatus, Pod, PodRegistry, PodStatus};
use crate::runtime::ContainerRuntime;
use crate::scheduler::{list_algorithms, select_node, AlgorithmCatalog, PlacementAlgorithm};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredNode {
    pub node_id: String,
    pub status: NodeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub pod_id: String,
    pub node_id: String,
}

/// Both registries, mutated together.
///
/// Every method that touches a reservation runs against `&mut self`, so
/// holding the write lock around a call makes the whole check-then-reserve
/// sequence one atomic step.
#[derive(Debug, Default)]
pub struct ClusterState {
    pub nodes: NodeRegistry,
    pub pods: PodRegistry,
}

impl ClusterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launch_pod(
        &mut self,
        cpu_required: u32,
        algorithm: PlacementAlgorithm,
    ) -> Result<Placement> {
        require_positive(cpu_required, "cpu_required")?;
        let node_id = select_node(cpu_required, algorithm, self.nodes.list())?;

        self.nodes.reserve(&node_id, cpu_required)?;
        let pod_id = self.pods.create(cpu_required, &node_id)?.pod_id.clone();
        self.nodes.attach_pod(&node_id, &pod_id)?;

        tracing::info!(
            pod_id = %pod_id,
            node_id = %node_id,
            cpu_required,
            algorithm = %algorithm,
            "Pod launched"
        );
        Ok(Placement { pod_id, node_id })
    }

    pub fn terminate_pod(&mut self, pod_id: &str) -> Result<Pod> {
        let pod = self.pods.get(pod_id)?.clone();
        if pod.status.is_terminal() {
            return Err(ClusterError::transition(
                format!("pod {}", pod_id),
                pod.status,
                PodStatus::Terminated,
            ));
        }

        self.pods.set_status(pod_id, PodStatus::Terminated)?;
        if pod.status.holds_reservation() {
            self.nodes.release(&pod.node_id, pod.cpu_required)?;
            self.nodes.detach_pod(&pod.node_id, pod_id)?;
        }

        tracing::info!(pod_id, node_id = %pod.node_id, "Pod terminated");
        self.pods.get(pod_id).cloned()
    }
}

/// Shared handle to the cluster. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Cluster {
    state: Arc<RwLock<ClusterState>>,
    runtime: Arc<dyn ContainerRuntime>,
}

impl Cluster {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ClusterState::new())),
            runtime,
        }
    }

    pub fn state(&self) -> &Arc<RwLock<ClusterState>> {
        &self.state
    }

    /// Register a node with `cpu_cores` cores.
    ///
    /// The container is created outside the lock; the id is reserved first so
    /// concurrent registrations never collide.
    pub async fn register_node(&self, cpu_cores: u32) -> Result<RegisteredNode> {
        require_positive(cpu_cores, "cpu_cores")?;
        let node_id = self.state.write().await.nodes.allocate_id();

        let container_id = match self.runtime.create(&node_id).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    node_id = %node_id,
                    error = %e,
                    "Failed to create node container"
                );
                return Err(e);
            }
        };

        let mut state = self.state.write().await;
        let node = state.nodes.register(node_id, cpu_cores, container_id, Instant::now())?;
        Ok(RegisteredNode {
            node_id: node.node_id.clone(),
            status: node.status,
        })
    }

    pub async fn list_nodes(&self) -> Vec<Node> {
        self.state.read().await.nodes.list().to_vec()
    }

    pub async fn get_node(&self, node_id: &str) -> Result<Node> {
        self.state.read().await.nodes.get(node_id).cloned()
    }

    pub async fn launch_pod(
        &self,
        cpu_required: u32,
        algorithm: PlacementAlgorithm,
    ) -> Result<Placement> {
        let result = self
            .state
            .write()
            .await
            .launch_pod(cpu_required, algorithm);
        if let Err(ClusterError::NoCapacity { requested }) = &result {
            tracing::warn!(requested, algorithm = %algorithm, "Pod rejected, no capacity");
        }
        result
    }

    pub async fn list_pods(&self) -> Vec<Pod> {
        self.state.read().await.pods.list().to_vec()
    }

    pub async fn get_pod(&self, pod_id: &str) -> Result<Pod> {
        self.state.read().await.pods.get(pod_id).cloned()
    }

    pub async fn terminate_pod(&self, pod_id: &str) -> Result<Pod> {
        self.state.write().await.terminate_pod(pod_id)
    }

    /// Record a heartbeat for `node_id`, returning the node's resulting status.
    pub async fn heartbeat(&self, node_id: &str) -> Result<NodeStatus> {
        self.state
            .write()
            .await
            .nodes
            .heartbeat(node_id, Instant::now())
    }

    pub fn list_algorithms(&self) -> AlgorithmCatalog {
        list_algorithms()
    }

    /// Fire-and-forget container removal. Failures are logged only.
    pub(crate) fn teardown_containers(&self, containers: Vec<(String, String)>) {
        for (node_id, container_id) in containers {
            let runtime = self.runtime.clone();
            tokio::spawn(async move {
                if let Err(e) = runtime.teardown(&container_id).await {
                    tracing::warn!(
                        node_id = %node_id,
                        container_id = %container_id,
                        error = %e,
                        "Failed to tear down node container"
                    );
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(cores: &[u32]) -> ClusterState {
        let mut state = ClusterState::new();
        for &c in cores {
            let id = state.nodes.allocate_id();
            state
                .nodes
                .register(id, c, "c".to_string(), Instant::now())
                .unwrap();
        }
        state
    }

    #[test]
    fn launch_reserves_and_attaches() {
        let mut state = state_with(&[4]);
        let placement = state
            .launch_pod(3, PlacementAlgorithm::FirstFit)
            .unwrap();

        assert_eq!(placement.node_id, "node-1");
        let node = state.nodes.get("node-1").unwrap();
        assert_eq!(node.available_cpu, 1);
        assert_eq!(node.pods, vec![placement.pod_id.clone()]);
        assert_eq!(
            state.pods.get(&placement.pod_id).unwrap().status,
            PodStatus::Running
        );
    }

    #[test]
    fn rejected_launch_leaves_no_trace() {
        let mut state = state_with(&[4]);
        state.launch_pod(3, PlacementAlgorithm::FirstFit).unwrap();

        let err = state
            .launch_pod(2, PlacementAlgorithm::FirstFit)
            .unwrap_err();
        assert_eq!(err, ClusterError::NoCapacity { requested: 2 });
        assert_eq!(state.pods.len(), 1);
        assert_eq!(state.nodes.get("node-1").unwrap().available_cpu, 1);
    }

    #[test]
    fn launch_rejects_zero_cpu() {
        let mut state = state_with(&[4]);
        assert!(matches!(
            state.launch_pod(0, PlacementAlgorithm::FirstFit),
            Err(ClusterError::InvalidInput(_))
        ));
        assert!(state.pods.is_empty());
    }

    #[test]
    fn terminate_releases_capacity_once() {
        let mut state = state_with(&[4]);
        let placement = state.launch_pod(3, PlacementAlgorithm::FirstFit).unwrap();

        let pod = state.terminate_pod(&placement.pod_id).unwrap();
        assert_eq!(pod.status, PodStatus::Terminated);
        let node = state.nodes.get("node-1").unwrap();
        assert_eq!(node.available_cpu, 4);
        assert!(node.pods.is_empty());

        let err = state.terminate_pod(&placement.pod_id).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidTransition { .. }));
        assert_eq!(state.nodes.get("node-1").unwrap().available_cpu, 4);
    }

    #[test]
    fn terminate_unknown_pod() {
        let mut state = state_with(&[4]);
        assert_eq!(
            state.terminate_pod("pod-1").unwrap_err(),
            ClusterError::PodNotFound("pod-1".to_string())
        );
    }
}
