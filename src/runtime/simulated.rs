use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{ClusterError, Result};
use crate::runtime::ContainerRuntime;

/// Runtime that hands out opaque handles without starting anything.
#[derive(Debug, Default)]
pub struct SimulatedRuntime {
    torn_down: Mutex<Vec<String>>,
    reject_creates: AtomicBool,
}

impl SimulatedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create` calls fail, as an unreachable daemon would.
    pub fn reject_creates(&self, reject: bool) {
        self.reject_creates.store(reject, Ordering::SeqCst);
    }

    /// Container ids that received a teardown call, in call order.
    pub fn torn_down(&self) -> Vec<String> {
        self.torn_down
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ContainerRuntime for SimulatedRuntime {
    async fn create(&self, name: &str) -> Result<String> {
        if self.reject_creates.load(Ordering::SeqCst) {
            return Err(ClusterError::Runtime(format!(
                "simulated runtime refused to create {}",
                name
            )));
        }
        Ok(format!("sim-{}", Uuid::new_v4().simple()))
    }

    async fn teardown(&self, container_id: &str) -> Result<()> {
        if let Ok(mut ids) = self.torn_down.lock() {
            ids.push(container_id.to_string());
        }
        Ok(())
    }
}
