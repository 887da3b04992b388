use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Pod not found: {0}")]
    PodNotFound(String),

    #[error("No healthy node has {requested} CPU cores available")]
    NoCapacity { requested: u32 },

    /// Reservation overrun. Unreachable while reservations go through
    /// the cluster write lock; seeing it means accounting is broken.
    #[error("Node {node_id} has {available} CPU cores available, {requested} requested")]
    InsufficientCapacity {
        node_id: String,
        available: u32,
        requested: u32,
    },

    #[error("Invalid transition for {entity}: {from} -> {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    #[error("Container runtime error: {0}")]
    Runtime(String),
}

impl ClusterError {
    pub(crate) fn transition(
        entity: impl Into<String>,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        ClusterError::InvalidTransition {
            entity: entity.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClusterError>;
