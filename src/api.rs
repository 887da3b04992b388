//! JSON control-plane API over the cluster.
//!
//! Routes mirror the operator dashboard's needs: register nodes, launch and
//! terminate pods, list everything, and poke heartbeats by hand.

use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cluster::Cluster;
use crate::error::ClusterError;
use crate::registry::{Node, NodeStatus, Pod};
use crate::scheduler::PlacementAlgorithm;

#[derive(Clone)]
pub struct ApiState {
    pub cluster: Cluster,
}

#[derive(Debug, Deserialize)]
pub struct RegisterNodeRequest {
    #[serde(default = "default_cpu")]
    pub cpu_cores: i64,
}

#[derive(Debug, Deserialize)]
pub struct LaunchPodRequest {
    #[serde(default = "default_cpu")]
    pub cpu_required: i64,
    #[serde(default)]
    pub algorithm: Option<String>,
}

fn default_cpu() -> i64 {
    1
}

#[derive(Serialize)]
struct NodeListResponse {
    nodes: Vec<Node>,
}

#[derive(Serialize)]
struct PodListResponse {
    pods: Vec<Pod>,
}

#[derive(Serialize)]
struct HeartbeatResponse {
    status: &'static str,
    node_id: String,
    node_status: NodeStatus,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
}

impl IntoResponse for ClusterError {
    fn into_response(self) -> Response {
        let code = match &self {
            ClusterError::InvalidInput(_) | ClusterError::NoCapacity { .. } => {
                StatusCode::BAD_REQUEST
            }
            ClusterError::NodeNotFound(_) | ClusterError::PodNotFound(_) => StatusCode::NOT_FOUND,
            ClusterError::InvalidTransition { .. } => StatusCode::CONFLICT,
            ClusterError::InsufficientCapacity { .. } | ClusterError::Runtime(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            code,
            Json(ErrorResponse {
                status: "error",
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Convert a JSON integer into a CPU count, rejecting zero, negatives and
/// values that do not fit in `u32`.
fn cpu_count(value: i64, field: &str) -> Result<u32, ClusterError> {
    match u32::try_from(value) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ClusterError::InvalidInput(format!(
            "{} must be a positive integer, got {}",
            field, value
        ))),
    }
}

/// Unwrap a JSON body, turning malformed or mistyped payloads into
/// `InvalidInput` so they share the error envelope.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ClusterError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ClusterError::InvalidInput(rejection.body_text()))
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/nodes", get(list_nodes_handler).post(register_node_handler))
        .route("/nodes/{node_id}", get(get_node_handler))
        .route("/pods", get(list_pods_handler).post(launch_pod_handler))
        .route(
            "/pods/{pod_id}",
            get(get_pod_handler).delete(terminate_pod_handler),
        )
        .route("/algorithms", get(list_algorithms_handler))
        .route("/heartbeat/{node_id}", post(heartbeat_handler))
        .route("/simulate/heartbeat/{node_id}", post(heartbeat_handler))
        .with_state(state)
}

/// Serve the API on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: ApiState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: Option<SocketAddr> = listener.local_addr().ok();
    tracing::info!(addr = ?addr, "Starting API server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

async fn register_node_handler(
    State(state): State<ApiState>,
    payload: Result<Json<RegisterNodeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ClusterError> {
    let payload = json_body(payload)?;
    let cpu_cores = cpu_count(payload.cpu_cores, "cpu_cores")?;
    let registered = state.cluster.register_node(cpu_cores).await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

async fn list_nodes_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(NodeListResponse {
        nodes: state.cluster.list_nodes().await,
    })
}

async fn get_node_handler(
    State(state): State<ApiState>,
    Path(node_id): Path<String>,
) -> Result<Json<Node>, ClusterError> {
    Ok(Json(state.cluster.get_node(&node_id).await?))
}

async fn launch_pod_handler(
    State(state): State<ApiState>,
    payload: Result<Json<LaunchPodRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ClusterError> {
    let payload = json_body(payload)?;
    let cpu_required = cpu_count(payload.cpu_required, "cpu_required")?;
    let algorithm = match payload.algorithm.as_deref() {
        Some(name) => name.parse::<PlacementAlgorithm>()?,
        None => PlacementAlgorithm::default(),
    };
    let placement = state.cluster.launch_pod(cpu_required, algorithm).await?;
    Ok((StatusCode::CREATED, Json(placement)))
}

async fn list_pods_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(PodListResponse {
        pods: state.cluster.list_pods().await,
    })
}

async fn get_pod_handler(
    State(state): State<ApiState>,
    Path(pod_id): Path<String>,
) -> Result<Json<Pod>, ClusterError> {
    Ok(Json(state.cluster.get_pod(&pod_id).await?))
}

async fn terminate_pod_handler(
    State(state): State<ApiState>,
    Path(pod_id): Path<String>,
) -> Result<Json<Pod>, ClusterError> {
    Ok(Json(state.cluster.terminate_pod(&pod_id).await?))
}

async fn list_algorithms_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.cluster.list_algorithms())
}

async fn heartbeat_handler(
    State(state): State<ApiState>,
    Path(node_id): Path<String>,
) -> Result<Json<HeartbeatResponse>, ClusterError> {
    let node_status = state.cluster.heartbeat(&node_id).await?;
    Ok(Json(HeartbeatResponse {
        status: "success",
        node_id,
        node_status,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_count_accepts_positive_values() {
        assert_eq!(cpu_count(4, "cpu_cores").unwrap(), 4);
    }

    #[test]
    fn cpu_count_rejects_out_of_range() {
        for value in [0, -1, i64::from(u32::MAX) + 1] {
            assert!(matches!(
                cpu_count(value, "cpu_cores"),
                Err(ClusterError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn error_status_codes() {
        let cases = [
            (ClusterError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (ClusterError::NoCapacity { requested: 1 }, StatusCode::BAD_REQUEST),
            (ClusterError::NodeNotFound("n".into()), StatusCode::NOT_FOUND),
            (ClusterError::PodNotFound("p".into()), StatusCode::NOT_FOUND),
            (
                ClusterError::transition("pod p", "failed", "terminated"),
                StatusCode::CONFLICT,
            ),
            (ClusterError::Runtime("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
