use std::net::{IpAddr, SocketAddr};

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use cluster_sim::config::{ClusterConfig, HealthConfig, RuntimeConfig, RuntimeKind};
use cluster_sim::control_plane::ControlPlane;
use cluster_sim::scheduler::PlacementAlgorithm;
use cluster_sim::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "cluster-sim")]
#[command(version)]
#[command(about = "A simulated compute cluster with pod placement and heartbeat failover")]
struct Args {
    /// Address to bind the API server to
    #[arg(long, env = "CLUSTER_SIM_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port for the API server
    #[arg(long, env = "CLUSTER_SIM_PORT", default_value = "5000")]
    port: u16,

    /// Container runtime backing each node
    #[arg(long, env = "CLUSTER_SIM_RUNTIME", default_value = "docker")]
    runtime: RuntimeArg,

    /// Image for node containers (docker runtime only)
    #[arg(long, env = "CLUSTER_SIM_IMAGE", default_value = "alpine")]
    image: String,

    /// How often the health sweep runs
    #[arg(long, env = "CLUSTER_SIM_SWEEP_INTERVAL_MS", default_value = "10000")]
    sweep_interval_ms: u64,

    /// Heartbeat staleness before a node is marked unhealthy
    #[arg(long, env = "CLUSTER_SIM_UNHEALTHY_THRESHOLD_MS", default_value = "30000")]
    unhealthy_threshold_ms: u64,

    /// Heartbeat staleness before an unhealthy node is terminated
    #[arg(long, env = "CLUSTER_SIM_TERMINATED_THRESHOLD_MS", default_value = "90000")]
    terminated_threshold_ms: u64,

    /// Placement algorithm for pods moved off terminated nodes
    #[arg(
        long,
        env = "CLUSTER_SIM_RESCHEDULING_ALGORITHM",
        default_value = "first_fit",
        value_parser = parse_algorithm
    )]
    rescheduling_algorithm: PlacementAlgorithm,
}

#[derive(Debug, Clone, ValueEnum)]
enum RuntimeArg {
    Docker,
    Simulated,
}

fn parse_algorithm(s: &str) -> Result<PlacementAlgorithm, String> {
    s.parse().map_err(|e: cluster_sim::ClusterError| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let runtime = RuntimeConfig {
        kind: match args.runtime {
            RuntimeArg::Docker => RuntimeKind::Docker,
            RuntimeArg::Simulated => RuntimeKind::Simulated,
        },
        image: args.image,
        ..RuntimeConfig::default()
    };

    let config = ClusterConfig::new(SocketAddr::new(args.host, args.port))
        .with_health(HealthConfig::new(
            args.sweep_interval_ms,
            args.unhealthy_threshold_ms,
            args.terminated_threshold_ms,
        ))
        .with_runtime(runtime)
        .with_rescheduling_algorithm(args.rescheduling_algorithm);

    tracing::info!(
        listen_addr = %config.listen_addr,
        runtime = ?config.runtime.kind,
        sweep_interval_ms = config.health.sweep_interval_ms,
        unhealthy_threshold_ms = config.health.unhealthy_threshold_ms,
        terminated_threshold_ms = config.health.terminated_threshold_ms,
        rescheduling_algorithm = %config.rescheduling_algorithm,
        "Starting cluster-sim control plane"
    );

    let control_plane = ControlPlane::new(config)?;
    let shutdown = install_shutdown_handler();
    control_plane.run(shutdown).await?;

    Ok(())
}
