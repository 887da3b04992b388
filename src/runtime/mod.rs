//! Container runtime backing each simulated node.
//!
//! The scheduler only needs two things from a runtime: an opaque handle when
//! a node is created, and a best-effort teardown once the node is
//! terminated.
//!
//! # Implementations
//!
//! - [`DockerRuntime`]: one idle container per node via the `docker` CLI
//! - [`SimulatedRuntime`]: in-process handles, used by tests and when no
//!   Docker daemon is available

pub mod docker;
pub mod simulated;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{RuntimeConfig, RuntimeKind};
use crate::error::Result;

pub use docker::DockerRuntime;
pub use simulated::SimulatedRuntime;

#[async_trait]
pub trait ContainerRuntime: Send + Sync + std::fmt::Debug {
    /// Start a container for the node called `name` and return its handle.
    async fn create(&self, name: &str) -> Result<String>;

    /// Stop and remove a container.
    async fn teardown(&self, container_id: &str) -> Result<()>;
}

pub fn from_config(config: &RuntimeConfig) -> Arc<dyn ContainerRuntime> {
    match config.kind {
        RuntimeKind::Docker => Arc::new(DockerRuntime::new(config.clone())),
        RuntimeKind::Simulated => Arc::new(SimulatedRuntime::new()),
    }
}
