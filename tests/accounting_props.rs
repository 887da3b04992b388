//! Property tests: random operation sequences never break CPU accounting
//! or move a node backwards through its lifecycle.


use std::time::Duration;

use proptest::prelude::*;
use tokio::time::Instant;

use cluster_sim::cluster::ClusterState;
use cluster_sim::health::sweep_state;
use cluster_sim::registry::NodeStatus;
use cluster_sim::rescheduler::ReschedulingEngine;
use cluster_sim::scheduler::PlacementAlgorithm;
use test_harness::{assert_accounting, test_health_config};

#[derive(Debug, Clone)]
enum Op {
    Register(u32),
    Launch(u32, PlacementAlgorithm),
    Terminate(usize),
    Heartbeat(usize),
    Advance(u64),
    Sweep,
}

fn algorithm() -> impl Strategy<Value = PlacementAlgorithm> {
    prop_oneof![
        Just(PlacementAlgorithm::FirstFit),
        Just(PlacementAlgorithm::BestFit),
        Just(PlacementAlgorithm::WorstFit),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => (1u32..=8).prop_map(Op::Register),
        3 => (1u32..=4, algorithm()).prop_map(|(cpu, a)| Op::Launch(cpu, a)),
        1 => (0usize..32).prop_map(Op::Terminate),
        2 => (0usize..8).prop_map(Op::Heartbeat),
        1 => (1u64..=500).prop_map(Op::Advance),
        1 => Just(Op::Sweep),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn random_operations_keep_accounting(ops in prop::collection::vec(op(), 1..80)) {
        let config = test_health_config();
        let engine = ReschedulingEngine::default();
        let mut state = ClusterState::new();
        let mut now = Instant::now();
        let mut seen: Vec<NodeStatus> = Vec::new();

        for op in ops {
            match op {
                Op::Register(cpu) => {
                    let node_id = state.nodes.allocate_id();
                    let container_id = format!("sim-{}", node_id);
                    state.nodes.register(node_id, cpu, container_id, now).unwrap();
                }
                Op::Launch(cpu, algorithm) => {
                    let _ = state.launch_pod(cpu, algorithm);
                }
                Op::Terminate(i) => {
                    if let Some(pod_id) = state.pods.list().get(i).map(|p| p.pod_id.clone()) {
                        let _ = state.terminate_pod(&pod_id);
                    }
                }
                Op::Heartbeat(i) => {
                    if let Some(node_id) = state.nodes.list().get(i).map(|n| n.node_id.clone()) {
                        state.nodes.heartbeat(&node_id, now).unwrap();
                    }
                }
                Op::Advance(ms) => now += Duration::from_millis(ms),
                Op::Sweep => {
                    sweep_state(&mut state, now, &config, &engine);
                }
            }

            assert_accounting(&state);

            // Terminated never leaves; healthy/unhealthy may flip on heartbeat
            for (i, node) in state.nodes.list().iter().enumerate() {
                if let Some(prev) = seen.get(i) {
                    if *prev == NodeStatus::Terminated {
                        prop_assert_eq!(node.status, NodeStatus::Terminated);
                    }
                }
                if node.status == NodeStatus::Terminated {
                    prop_assert!(node.pods.is_empty());
                }
            }
            seen = state.nodes.list().iter().map(|n| n.status).collect();
        }
    }

    #[test]
    fn placement_respects_capacity(
        cores in prop::collection::vec(1u32..=16, 1..8),
        requests in prop::collection::vec((1u32..=8, algorithm()), 1..40),
    ) {
        let mut state = ClusterState::new();
        let now = Instant::now();
        for cpu in cores {
            let node_id = state.nodes.allocate_id();
            state.nodes.register(node_id, cpu, String::new(), now).unwrap();
        }

        for (cpu, algorithm) in requests {
            let before: Vec<u32> = state.nodes.list().iter().map(|n| n.available_cpu).collect();
            match state.launch_pod(cpu, algorithm) {
                Ok(placement) => {
                    let node = state.nodes.get(&placement.node_id).unwrap();
                    prop_assert!(node.available_cpu + cpu <= node.cpu_cores);
                }
                Err(_) => {
                    prop_assert!(before.iter().all(|&free| free < cpu));
                }
            }
        }
        assert_accounting(&state);
    }
}
