use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::RuntimeConfig;
use crate::error::{ClusterError, Result};
use crate::runtime::ContainerRuntime;

/// Backs every node with an idle container managed through the `docker` CLI.
///
/// The container runs `tail -f /dev/null` so it stays up until the node is
/// terminated.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    config: RuntimeConfig,
}

impl DockerRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    fn run_args(&self, name: &str) -> Vec<String> {
        vec![
            "run".to_string(),
            "-d".to_string(),
            format!("--name={}", name),
            format!("--label={}", self.config.label),
            self.config.image.clone(),
            "tail".to_string(),
            "-f".to_string(),
            "/dev/null".to_string(),
        ]
    }

    async fn docker(args: &[String]) -> Result<String> {
        let result = Command::new("docker")
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        Self::process_output(result)
    }

    fn process_output(result: std::io::Result<std::process::Output>) -> Result<String> {
        match result {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                Err(ClusterError::Runtime(if stderr.is_empty() {
                    format!("docker exited with {:?}", output.status.code())
                } else {
                    stderr
                }))
            }
            Err(e) => Err(ClusterError::Runtime(format!("failed to run docker: {}", e))),
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create(&self, name: &str) -> Result<String> {
        tracing::info!(name, image = %self.config.image, "Creating node container");
        let container_id = Self::docker(&self.run_args(name)).await?;
        if container_id.is_empty() {
            return Err(ClusterError::Runtime(format!(
                "docker returned no container id for {}",
                name
            )));
        }
        Ok(container_id)
    }

    async fn teardown(&self, container_id: &str) -> Result<()> {
        tracing::info!(container_id, "Removing node container");
        Self::docker(&["rm".to_string(), "-f".to_string(), container_id.to_string()]).await?;
        Ok(())
    }
}
