use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{ClusterError, Result};
use crate::scheduler::PlacementAlgorithm;

/// Heartbeat staleness thresholds and sweep cadence.
///
/// Defaults let roughly three missed sweeps pass before a node is marked
/// unhealthy, and six more before it is terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthConfig {
    pub sweep_interval_ms: u64,
    /// Staleness after which a healthy node becomes unhealthy
    pub unhealthy_threshold_ms: u64,
    /// Staleness after which an unhealthy node is terminated
    pub terminated_threshold_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: 10_000,
            unhealthy_threshold_ms: 30_000,
            terminated_threshold_ms: 90_000,
        }
    }
}

impl HealthConfig {
    pub fn new(
        sweep_interval_ms: u64,
        unhealthy_threshold_ms: u64,
        terminated_threshold_ms: u64,
    ) -> Self {
        Self {
            sweep_interval_ms,
            unhealthy_threshold_ms,
            terminated_threshold_ms,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn unhealthy_threshold(&self) -> Duration {
        Duration::from_millis(self.unhealthy_threshold_ms)
    }

    pub fn terminated_threshold(&self) -> Duration {
        Duration::from_millis(self.terminated_threshold_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval_ms == 0 {
            return Err(ClusterError::InvalidInput(
                "sweep interval must be positive".to_string(),
            ));
        }
        if self.unhealthy_threshold_ms == 0 {
            return Err(ClusterError::InvalidInput(
                "unhealthy threshold must be positive".to_string(),
            ));
        }
        if self.terminated_threshold_ms <= self.unhealthy_threshold_ms {
            return Err(ClusterError::InvalidInput(format!(
                "terminated threshold ({}ms) must exceed unhealthy threshold ({}ms)",
                self.terminated_threshold_ms, self.unhealthy_threshold_ms
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    /// One real container per node through the `docker` CLI
    Docker,
    /// In-process handles, no containers
    Simulated,
}

/// Container runtime settings for node backing containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub kind: RuntimeKind,
    /// Image each node container runs
    pub image: String,
    /// Label attached to every node container so they can be found and
    /// cleaned up in bulk
    pub label: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            kind: RuntimeKind::Docker,
            image: "alpine".to_string(),
            label: "cluster-sim=true".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn simulated() -> Self {
        Self {
            kind: RuntimeKind::Simulated,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub listen_addr: SocketAddr,
    pub health: HealthConfig,
    pub runtime: RuntimeConfig,
    /// Strategy used when moving pods off a terminated node
    pub rescheduling_algorithm: PlacementAlgorithm,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            health: HealthConfig::default(),
            runtime: RuntimeConfig::default(),
            rescheduling_algorithm: PlacementAlgorithm::default(),
        }
    }
}

impl ClusterConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_health(mut self, health: HealthConfig) -> Self {
        self.health = health;
        self
    }

    pub fn with_runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_rescheduling_algorithm(mut self, algorithm: PlacementAlgorithm) -> Self {
        self.rescheduling_algorithm = algorithm;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.health.validate()
    }
}
