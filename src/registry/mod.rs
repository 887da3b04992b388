pub mod node;
pub mod pod;

pub use node::{Node, NodeRegistry, NodeStatus};
pub use pod::{Pod, PodRegistry, PodStatus};
