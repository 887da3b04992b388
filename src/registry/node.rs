use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::error::{ClusterError, Result};

/// Node health. Ordered: a node only moves forward through
/// `Healthy -> Unhealthy -> Terminated`, except that a heartbeat may bring
/// an `Unhealthy` node back to `Healthy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Healthy,
    Unhealthy,
    Terminated,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Healthy => write!(f, "healthy"),
            NodeStatus::Unhealthy => write!(f, "unhealthy"),
            NodeStatus::Terminated => write!(f, "terminated"),
        }
    }
}

/// A simulated worker with fixed CPU capacity.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub node_id: String,
    pub cpu_cores: u32,
    pub available_cpu: u32,
    pub status: NodeStatus,
    /// Runtime handle. Kept after termination for audit.
    pub container_id: String,
    /// Pods holding a reservation on this node, in attach order.
    pub pods: Vec<String>,
    pub last_heartbeat: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Monotonic twin of `last_heartbeat`, used for staleness checks.
    #[serde(skip)]
    pub last_seen: Instant,
    #[serde(skip)]
    pub evicted: bool,
}

impl Node {
    pub fn new(node_id: String, cpu_cores: u32, container_id: String, now: Instant) -> Self {
        let wall = Utc::now();
        Self {
            node_id,
            cpu_cores,
            available_cpu: cpu_cores,
            status: NodeStatus::Healthy,
            container_id,
            pods: Vec::new(),
            last_heartbeat: wall,
            created_at: wall,
            last_seen: now,
            evicted: false,
        }
    }

    /// Time since the last heartbeat, as seen at `now`.
    pub fn staleness(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }

    pub fn reserved_cpu(&self) -> u32 {
        self.cpu_cores - self.available_cpu
    }

    /// True if the node may receive a pod needing `cpu_required` cores.
    pub fn fits(&self, cpu_required: u32) -> bool {
        self.status == NodeStatus::Healthy && self.available_cpu >= cpu_required
    }
}

pub(crate) fn require_positive(value: u32, field: &str) -> Result<()> {
    if value == 0 {
        return Err(ClusterError::InvalidInput(format!(
            "{} must be a positive integer",
            field
        )));
    }
    Ok(())
}

/// Owns node entities and their CPU accounting.
///
/// Nodes are never removed, so the vector order is registration order and
/// the index stays valid for the lifetime of the registry.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    next_id: u64,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next `node-<n>` identifier. Ids are never reused, even
    /// when the registration they were allocated for is abandoned.
    pub fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("node-{}", self.next_id)
    }

    pub fn register(
        &mut self,
        node_id: String,
        cpu_cores: u32,
        container_id: String,
        now: Instant,
    ) -> Result<&Node> {
        require_positive(cpu_cores, "cpu_cores")?;
        if self.index.contains_key(&node_id) {
            return Err(ClusterError::InvalidInput(format!(
                "node {} is already registered",
                node_id
            )));
        }

        let slot = self.nodes.len();
        self.index.insert(node_id.clone(), slot);
        self.nodes.push(Node::new(node_id, cpu_cores, container_id, now));
        tracing::info!(
            node_id = %self.nodes[slot].node_id,
            cpu_cores,
            "Node registered"
        );
        Ok(&self.nodes[slot])
    }

    /// All nodes in registration order.
    pub fn list(&self) -> &[Node] {
        &self.nodes
    }

    pub fn get(&self, node_id: &str) -> Result<&Node> {
        self.index
            .get(node_id)
            .map(|&slot| &self.nodes[slot])
            .ok_or_else(|| ClusterError::NodeNotFound(node_id.to_string()))
    }

    fn get_mut(&mut self, node_id: &str) -> Result<&mut Node> {
        match self.index.get(node_id) {
            Some(&slot) => Ok(&mut self.nodes[slot]),
            None => Err(ClusterError::NodeNotFound(node_id.to_string())),
        }
    }

    pub fn reserve(&mut self, node_id: &str, amount: u32) -> Result<()> {
        let node = self.get_mut(node_id)?;
        if amount > node.available_cpu {
            return Err(ClusterError::InsufficientCapacity {
                node_id: node_id.to_string(),
                available: node.available_cpu,
                requested: amount,
            });
        }
        node.available_cpu -= amount;
        Ok(())
    }

    pub fn release(&mut self, node_id: &str, amount: u32) -> Result<()> {
        let node = self.get_mut(node_id)?;
        if amount > node.reserved_cpu() {
            return Err(ClusterError::InvalidInput(format!(
                "cannot release {} cores on {}: only {} reserved",
                amount,
                node_id,
                node.reserved_cpu()
            )));
        }
        node.available_cpu += amount;
        Ok(())
    }

    pub(crate) fn attach_pod(&mut self, node_id: &str, pod_id: &str) -> Result<()> {
        let node = self.get_mut(node_id)?;
        if !node.pods.iter().any(|p| p == pod_id) {
            node.pods.push(pod_id.to_string());
        }
        Ok(())
    }

    pub(crate) fn detach_pod(&mut self, node_id: &str, pod_id: &str) -> Result<()> {
        let node = self.get_mut(node_id)?;
        node.pods.retain(|p| p != pod_id);
        Ok(())
    }

    /// Move a node forward in its lifecycle. Returns the previous status.
    ///
    /// Setting the current status again is a no-op. Any backward move fails;
    /// the heartbeat path is the only way back to `Healthy`.
    pub fn set_status(&mut self, node_id: &str, status: NodeStatus) -> Result<NodeStatus> {
        let node = self.get_mut(node_id)?;
        let previous = node.status;
        if status < previous {
            return Err(ClusterError::transition(
                format!("node {}", node_id),
                previous,
                status,
            ));
        }
        node.status = status;
        Ok(previous)
    }

    /// Record a heartbeat and return the resulting status.
    ///
    /// `Unhealthy` nodes recover to `Healthy`. `Terminated` nodes keep their
    /// status; the timestamp is still recorded.
    pub fn heartbeat(&mut self, node_id: &str, now: Instant) -> Result<NodeStatus> {
        let node = self.get_mut(node_id)?;
        node.last_seen = now;
        node.last_heartbeat = Utc::now();
        match node.status {
            NodeStatus::Unhealthy => {
                node.status = NodeStatus::Healthy;
                tracing::info!(node_id, "Node recovered after heartbeat");
            }
            NodeStatus::Terminated => {
                tracing::debug!(node_id, "Heartbeat from terminated node ignored");
            }
            NodeStatus::Healthy => {}
        }
        Ok(node.status)
    }

    pub(crate) fn mark_evicted(&mut self, node_id: &str) -> Result<()> {
        self.get_mut(node_id)?.evicted = true;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
