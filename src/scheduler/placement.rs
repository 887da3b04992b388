use crate::error::{ClusterError, Result};
use crate::registry::Node;
use crate::scheduler::algorithm::PlacementAlgorithm;

/// Pick a node for a pod needing `cpu_required` cores.
///
/// `candidates` must be in registration order; ties are broken in favor of
/// the earlier node. Only healthy nodes with enough free CPU are considered.
/// The result depends on nothing but the arguments.
pub fn select_node(
    cpu_required: u32,
    algorithm: PlacementAlgorithm,
    candidates: &[Node],
) -> Result<String> {
    let mut fitting = candidates.iter().filter(|n| n.fits(cpu_required));

    let chosen = match algorithm {
        PlacementAlgorithm::FirstFit => fitting.next(),
        PlacementAlgorithm::BestFit => pick(fitting, |candidate, best| {
            candidate.available_cpu < best.available_cpu
        }),
        PlacementAlgorithm::WorstFit => pick(fitting, |candidate, best| {
            candidate.available_cpu > best.available_cpu
        }),
    };

    chosen
        .map(|node| node.node_id.clone())
        .ok_or(ClusterError::NoCapacity {
            requested: cpu_required,
        })
}

/// Keep the first node unless a later one is strictly better, which makes
/// earlier registration win every tie.
fn pick<'a>(
    nodes: impl Iterator<Item = &'a Node>,
    better: impl Fn(&Node, &Node) -> bool,
) -> Option<&'a Node> {
    nodes.fold(None, |best, candidate| match best {
        Some(current) if !better(candidate, current) => Some(current),
        _ => Some(candidate),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NodeStatus;
    use tokio::time::Instant;

    fn node(id: &str, cores: u32, available: u32) -> Node {
        let mut n = Node::new(id.to_string(), cores, "c".to_string(), Instant::now());
        n.available_cpu = available;
        n
    }

    #[test]
    fn first_fit_takes_earliest_fitting() {
        let nodes = vec![node("a", 2, 1), node("b", 8, 8), node("c", 4, 4)];
        assert_eq!(
            select_node(2, PlacementAlgorithm::FirstFit, &nodes).unwrap(),
            "b"
        );
    }

    #[test]
    fn best_fit_takes_tightest() {
        let nodes = vec![node("a", 8, 8), node("b", 4, 3), node("c", 2, 2)];
        assert_eq!(
            select_node(2, PlacementAlgorithm::BestFit, &nodes).unwrap(),
            "c"
        );
    }

    #[test]
    fn worst_fit_takes_roomiest() {
        let nodes = vec![node("a", 2, 2), node("b", 8, 8), node("c", 4, 4)];
        assert_eq!(
            select_node(2, PlacementAlgorithm::WorstFit, &nodes).unwrap(),
            "b"
        );
    }

    #[test]
    fn ties_go_to_earliest_registration() {
        let nodes = vec![node("a", 4, 4), node("b", 4, 4), node("c", 4, 4)];
        for algorithm in PlacementAlgorithm::ALL {
            assert_eq!(select_node(1, algorithm, &nodes).unwrap(), "a");
        }
    }

    #[test]
    fn unhealthy_and_terminated_nodes_are_skipped() {
        let mut sick = node("a", 8, 8);
        sick.status = NodeStatus::Unhealthy;
        let mut dead = node("b", 8, 8);
        dead.status = NodeStatus::Terminated;
        let nodes = vec![sick, dead, node("c", 2, 2)];

        for algorithm in PlacementAlgorithm::ALL {
            assert_eq!(select_node(2, algorithm, &nodes).unwrap(), "c");
        }
    }

    #[test]
    fn no_capacity_when_nothing_fits() {
        let nodes = vec![node("a", 4, 1), node("b", 2, 0)];
        assert_eq!(
            select_node(2, PlacementAlgorithm::WorstFit, &nodes).unwrap_err(),
            ClusterError::NoCapacity { requested: 2 }
        );
        assert!(select_node(1, PlacementAlgorithm::FirstFit, &[]).is_err());
    }

    #[test]
    fn exact_fit_is_accepted() {
        let nodes = vec![node("a", 3, 3)];
        assert_eq!(
            select_node(3, PlacementAlgorithm::BestFit, &nodes).unwrap(),
            "a"
        );
    }
}
