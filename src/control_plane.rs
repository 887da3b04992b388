use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::{self, ApiState};
use crate::cluster::Cluster;
use crate::config::ClusterConfig;
use crate::error::Result;
use crate::health::HealthMonitor;
use crate::rescheduler::ReschedulingEngine;
use crate::runtime::{self, ContainerRuntime};

/// Owns the cluster state and every long-lived task around it.
pub struct ControlPlane {
    pub config: ClusterConfig,
    pub cluster: Cluster,
    pub monitor: HealthMonitor,
}

impl ControlPlane {
    /// Build a control plane with the runtime named in `config`.
    pub fn new(config: ClusterConfig) -> Result<Self> {
        let runtime = runtime::from_config(&config.runtime);
        Self::with_runtime(config, runtime)
    }

    pub fn with_runtime(config: ClusterConfig, runtime: Arc<dyn ContainerRuntime>) -> Result<Self> {
        config.validate()?;
        let cluster = Cluster::new(runtime);
        let monitor = HealthMonitor::new(
            cluster.clone(),
            config.health.clone(),
            ReschedulingEngine::new(config.rescheduling_algorithm),
        );
        Ok(Self {
            config,
            cluster,
            monitor,
        })
    }

    /// Bind the configured address and run until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.config.listen_addr)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    addr = %self.config.listen_addr,
                    error = %e,
                    "Failed to bind API server"
                );
            })?;
        self.run_with_listener(listener, shutdown).await
    }

    /// Run the health monitor and the API on an already bound listener.
    ///
    /// 1. Spawns the health sweep loop
    /// 2. Serves the API until `shutdown` fires or the server fails
    /// 3. Cancels and joins the sweep loop so no sweep is cut short
    pub async fn run_with_listener(
        self,
        listener: tokio::net::TcpListener,
        shutdown: CancellationToken,
    ) -> std::io::Result<()> {
        let monitor_token = shutdown.child_token();
        let monitor = self.monitor.clone();
        let monitor_handle = tokio::spawn(monitor.run(monitor_token.clone()));

        let state = ApiState {
            cluster: self.cluster.clone(),
        };
        let served = api::serve(listener, state, shutdown.clone()).await;
        if let Err(e) = &served {
            tracing::error!(error = %e, "API server failed");
        }

        monitor_token.cancel();
        if let Err(e) = monitor_handle.await {
            tracing::error!(error = %e, "Health monitor task panicked");
        }

        tracing::info!("Control plane stopped");
        served
    }
}
