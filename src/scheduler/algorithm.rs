use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClusterError;

/// Placement strategies, selected by name at request time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementAlgorithm {
    /// First fitting node in registration order
    #[default]
    FirstFit,
    /// Fitting node with the least free CPU (bin packing)
    BestFit,
    /// Fitting node with the most free CPU (spreading)
    WorstFit,
}

impl PlacementAlgorithm {
    pub const ALL: [PlacementAlgorithm; 3] = [
        PlacementAlgorithm::FirstFit,
        PlacementAlgorithm::BestFit,
        PlacementAlgorithm::WorstFit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PlacementAlgorithm::FirstFit => "first_fit",
            PlacementAlgorithm::BestFit => "best_fit",
            PlacementAlgorithm::WorstFit => "worst_fit",
        }
    }
}

impl std::fmt::Display for PlacementAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlacementAlgorithm {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| ClusterError::InvalidInput(format!("unknown algorithm: {}", s)))
    }
}

/// The recognized algorithm names plus the default one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlgorithmCatalog {
    pub algorithms: Vec<String>,
    pub default: String,
}

pub fn list_algorithms() -> AlgorithmCatalog {
    AlgorithmCatalog {
        algorithms: PlacementAlgorithm::ALL
            .iter()
            .map(|a| a.name().to_string())
            .collect(),
        default: PlacementAlgorithm::default().name().to_string(),
    }
}
