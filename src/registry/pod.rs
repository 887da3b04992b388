use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ClusterError, Result};
use crate::registry::node::require_positive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PodStatus {
    Pending,
    Running,
    Rescheduling,
    Failed,
    Terminated,
}

impl PodStatus {
    /// Running and rescheduling pods hold CPU on their node.
    pub fn holds_reservation(self) -> bool {
        matches!(self, PodStatus::Running | PodStatus::Rescheduling)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PodStatus::Failed | PodStatus::Terminated)
    }

    fn can_move_to(self, next: PodStatus) -> bool {
        use PodStatus::*;
        matches!(
            (self, next),
            (Pending, Running | Failed | Terminated)
                | (Running, Rescheduling | Terminated)
                | (Rescheduling, Running | Failed | Terminated)
        )
    }
}

impl std::fmt::Display for PodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PodStatus::Pending => write!(f, "pending"),
            PodStatus::Running => write!(f, "running"),
            PodStatus::Rescheduling => write!(f, "rescheduling"),
            PodStatus::Failed => write!(f, "failed"),
            PodStatus::Terminated => write!(f, "terminated"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Pod {
    pub pod_id: String,
    pub cpu_required: u32,
    /// Hosting node, or the last one that hosted it once the pod is terminal.
    pub node_id: String,
    pub status: PodStatus,
    pub created_at: DateTime<Utc>,
}

/// Owns pod entities and their lifecycle state.
#[derive(Debug, Default)]
pub struct PodRegistry {
    pods: Vec<Pod>,
    index: HashMap<String, usize>,
    next_id: u64,
}

impl PodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pod that is already placed on `node_id`. The caller is
    /// responsible for the matching node reservation.
    pub fn create(&mut self, cpu_required: u32, node_id: &str) -> Result<&Pod> {
        require_positive(cpu_required, "cpu_required")?;
        self.next_id += 1;
        let pod = Pod {
            pod_id: format!("pod-{}", self.next_id),
            cpu_required,
            node_id: node_id.to_string(),
            status: PodStatus::Running,
            created_at: Utc::now(),
        };
        let slot = self.pods.len();
        self.index.insert(pod.pod_id.clone(), slot);
        self.pods.push(pod);
        Ok(&self.pods[slot])
    }

    /// All pods in creation order.
    pub fn list(&self) -> &[Pod] {
        &self.pods
    }

    pub fn get(&self, pod_id: &str) -> Result<&Pod> {
        self.index
            .get(pod_id)
            .map(|&slot| &self.pods[slot])
            .ok_or_else(|| ClusterError::PodNotFound(pod_id.to_string()))
    }

    fn get_mut(&mut self, pod_id: &str) -> Result<&mut Pod> {
        match self.index.get(pod_id) {
            Some(&slot) => Ok(&mut self.pods[slot]),
            None => Err(ClusterError::PodNotFound(pod_id.to_string())),
        }
    }

    pub fn set_status(&mut self, pod_id: &str, status: PodStatus) -> Result<PodStatus> {
        let pod = self.get_mut(pod_id)?;
        let previous = pod.status;
        if !previous.can_move_to(status) {
            return Err(ClusterError::transition(
                format!("pod {}", pod_id),
                previous,
                status,
            ));
        }
        pod.status = status;
        Ok(previous)
    }

    pub(crate) fn reassign(&mut self, pod_id: &str, node_id: &str) -> Result<()> {
        self.get_mut(pod_id)?.node_id = node_id.to_string();
        Ok(())
    }

    /// Pods currently holding a reservation on `node_id`, in creation order.
    pub fn reserving_on(&self, node_id: &str) -> Vec<&Pod> {
        self.pods
            .iter()
            .filter(|p| p.node_id == node_id && p.status.holds_reservation())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }
}
