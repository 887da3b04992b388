pub mod api;
pub mod cluster;
pub mod config;
pub mod control_plane;
pub mod error;
pub mod health;
pub mod registry;
pub mod rescheduler;
pub mod runtime;
pub mod scheduler;
pub mod shutdown;

pub use cluster::{Cluster, ClusterState, Placement, RegisteredNode};
pub use error::{ClusterError, Result};
