//! Heartbeat-driven failure detection.
//!
//! Each node walks a small state machine driven by heartbeat staleness:
//!
//! ```text
//!   healthy --(stale > unhealthy_threshold)--> unhealthy
//!   unhealthy --(stale > terminated_threshold)--> terminated  (+ eviction)
//!   unhealthy --(heartbeat)--> healthy
//! ```
//!
//! Sweeps take the cluster write lock for their whole duration, so a
//! heartbeat is applied either entirely before or entirely after a sweep.

use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::cluster::{Cluster, ClusterState};
use crate::config::HealthConfig;
use crate::error::Result;
use crate::registry::NodeStatus;
use crate::rescheduler::{EvictionReport, ReschedulingEngine};

/// What a single sweep changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub marked_unhealthy: Vec<String>,
    pub terminated: Vec<String>,
    pub evictions: Vec<EvictionReport>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.marked_unhealthy.is_empty() && self.terminated.is_empty()
    }
}

/// Apply one sweep at instant `now` to `state`.
///
/// Nodes are visited in registration order. A node stale past both
/// thresholds passes through `unhealthy` and is terminated in the same
/// sweep. Evictions run only after every status change of the sweep has
/// been applied, so displaced pods land on nodes that are still healthy
/// as of `now`.
pub fn sweep_state(
    state: &mut ClusterState,
    now: Instant,
    config: &HealthConfig,
    engine: &ReschedulingEngine,
) -> SweepReport {
    let mut report = SweepReport::default();
    let observed: Vec<(String, NodeStatus, std::time::Duration)> = state
        .nodes
        .list()
        .iter()
        .filter(|n| n.status != NodeStatus::Terminated)
        .map(|n| (n.node_id.clone(), n.status, n.staleness(now)))
        .collect();

    for (node_id, mut status, staleness) in observed {
        if status == NodeStatus::Healthy && staleness > config.unhealthy_threshold() {
            if let Err(e) = state.nodes.set_status(&node_id, NodeStatus::Unhealthy) {
                tracing::error!(node_id = %node_id, error = %e, "Failed to mark node unhealthy");
                continue;
            }
            tracing::warn!(
                node_id = %node_id,
                staleness_ms = staleness.as_millis() as u64,
                "Node is unhealthy"
            );
            report.marked_unhealthy.push(node_id.clone());
            status = NodeStatus::Unhealthy;
        }

        if status == NodeStatus::Unhealthy && staleness > config.terminated_threshold() {
            if let Err(e) = state.nodes.set_status(&node_id, NodeStatus::Terminated) {
                tracing::error!(node_id = %node_id, error = %e, "Failed to terminate node");
                continue;
            }
            tracing::warn!(
                node_id = %node_id,
                staleness_ms = staleness.as_millis() as u64,
                "Node terminated"
            );
            report.terminated.push(node_id);
        }
    }

    for node_id in &report.terminated {
        match engine.evict(state, node_id) {
            Ok(eviction) => report.evictions.push(eviction),
            Err(e) => {
                tracing::error!(node_id = %node_id, error = %e, "Eviction failed");
            }
        }
    }

    report
}

/// Background health checker for all registered nodes.
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    cluster: Cluster,
    config: HealthConfig,
    engine: ReschedulingEngine,
}

impl HealthMonitor {
    pub fn new(cluster: Cluster, config: HealthConfig, engine: ReschedulingEngine) -> Self {
        Self {
            cluster,
            config,
            engine,
        }
    }

    /// Manual heartbeat trigger.
    pub async fn heartbeat(&self, node_id: &str) -> Result<NodeStatus> {
        self.cluster.heartbeat(node_id).await
    }

    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(Instant::now()).await
    }

    /// Run one sweep as of `now`, then hand terminated nodes' containers to
    /// the runtime for teardown.
    pub async fn sweep_at(&self, now: Instant) -> SweepReport {
        let (report, containers) = {
            let mut state = self.cluster.state().write().await;
            let report = sweep_state(&mut state, now, &self.config, &self.engine);
            let containers: Vec<(String, String)> = report
                .terminated
                .iter()
                .filter_map(|id| state.nodes.get(id).ok())
                .map(|n| (n.node_id.clone(), n.container_id.clone()))
                .collect();
            (report, containers)
        };

        self.cluster.teardown_containers(containers);
        report
    }

    /// Sweep on a fixed interval until `shutdown` is cancelled.
    ///
    /// A sweep that has already taken the lock finishes before the loop
    /// notices the cancellation.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            sweep_interval_ms = self.config.sweep_interval_ms,
            unhealthy_threshold_ms = self.config.unhealthy_threshold_ms,
            terminated_threshold_ms = self.config.terminated_threshold_ms,
            rescheduling_algorithm = %self.engine.algorithm(),
            "Starting health monitor"
        );

        let mut interval = tokio::time::interval(self.config.sweep_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing can be stale yet.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Health monitor shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let report = self.sweep().await;
                    if !report.is_empty() {
                        tracing::info!(
                            unhealthy = ?report.marked_unhealthy,
                            terminated = ?report.terminated,
                            "Health sweep changed node status"
                        );
                    }
                }
            }
        }
    }
}
