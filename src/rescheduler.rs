use serde::Serialize;

use crate::cluster::ClusterState;
use crate::error::{ClusterError, Result};
use crate::registry::{NodeStatus, PodStatus};
use crate::scheduler::{select_node, PlacementAlgorithm};

/// Outcome of evicting one terminated node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvictionReport {
    pub node_id: String,
    /// `(pod_id, new node_id)` for every pod that found a new home
    pub rescheduled: Vec<(String, String)>,
    /// Pods left `failed` because no healthy node had room
    pub failed: Vec<String>,
}

impl EvictionReport {
    fn new(node_id: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rescheduled.is_empty() && self.failed.is_empty()
    }
}

/// Moves pods off terminated nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReschedulingEngine {
    algorithm: PlacementAlgorithm,
}

impl ReschedulingEngine {
    pub fn new(algorithm: PlacementAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> PlacementAlgorithm {
        self.algorithm
    }

    /// Evict every pod reserving capacity on the terminated node `node_id`.
    ///
    /// Each pod goes `rescheduling`, releases its old reservation, then ends
    /// `running` on a new node or `failed`. Runs at most once per node; later
    /// calls return an empty report.
    pub fn evict(&self, state: &mut ClusterState, node_id: &str) -> Result<EvictionReport> {
        let node = state.nodes.get(node_id)?;
        if node.status != NodeStatus::Terminated {
            return Err(ClusterError::transition(
                format!("node {}", node_id),
                node.status,
                "evicted",
            ));
        }
        if node.evicted {
            tracing::debug!(node_id, "Node already evicted");
            return Ok(EvictionReport::new(node_id));
        }

        let displaced: Vec<(String, u32, PodStatus)> = state
            .pods
            .reserving_on(node_id)
            .into_iter()
            .map(|p| (p.pod_id.clone(), p.cpu_required, p.status))
            .collect();

        let mut report = EvictionReport::new(node_id);
        for (pod_id, cpu_required, status) in displaced {
            if status == PodStatus::Running {
                state.pods.set_status(&pod_id, PodStatus::Rescheduling)?;
            }
            state.nodes.release(node_id, cpu_required)?;
            state.nodes.detach_pod(node_id, &pod_id)?;

            match select_node(cpu_required, self.algorithm, state.nodes.list()) {
                Ok(target) => {
                    state.nodes.reserve(&target, cpu_required)?;
                    state.nodes.attach_pod(&target, &pod_id)?;
                    state.pods.reassign(&pod_id, &target)?;
                    state.pods.set_status(&pod_id, PodStatus::Running)?;
                    tracing::info!(
                        pod_id = %pod_id,
                        from = node_id,
                        to = %target,
                        "Pod rescheduled"
                    );
                    report.rescheduled.push((pod_id, target));
                }
                Err(ClusterError::NoCapacity { .. }) => {
                    state.pods.set_status(&pod_id, PodStatus::Failed)?;
                    tracing::warn!(
                        pod_id = %pod_id,
                        from = node_id,
                        cpu_required,
                        "No capacity to reschedule pod, marked failed"
                    );
                    report.failed.push(pod_id);
                }
                Err(e) => return Err(e),
            }
        }

        state.nodes.mark_evicted(node_id)?;
        tracing::info!(
            node_id,
            rescheduled = report.rescheduled.len(),
            failed = report.failed.len(),
            "Node evicted"
        );
        Ok(report)
    }
}
