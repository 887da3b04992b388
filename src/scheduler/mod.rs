//! Placement strategies.
//!
//! Stateless: every decision is a pure function of the requested CPU, the
//! chosen [`PlacementAlgorithm`] and a snapshot of the nodes.

pub mod algorithm;
pub mod placement;

pub use algorithm::{list_algorithms, AlgorithmCatalog, PlacementAlgorithm};
pub use placement::select_node;
