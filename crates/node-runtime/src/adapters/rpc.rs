//! # HTTP Surface
//!
//! | Method | Path               | Purpose                               |
//! |--------|--------------------|---------------------------------------|
//! | POST   | `/v1/transactions` | SendTransaction from clients          |
//! | POST   | `/v1/proposals`    | SendProposal from other ordering nodes|
//! | GET    | `/v1/peers`        | Current peer list                     |
//! | PUT    | `/v1/peers`        | Replace peer list                     |
//! | POST   | `/v1/peers`        | Add one peer                          |
//! | DELETE | `/v1/peers/:addr`  | Remove one peer                       |
//! | GET    | `/v1/status`       | State, queue length, metrics          |
//! | GET    | `/health`          | Liveness                              |
//!
//! Rejections carry an explicit status and a machine-readable `error` code:
//! `400 malformed`, `503 queue_full`, `503 service_stopped`.
//!
//! Request bodies are capped by [`request_body_limit`], which always admits
//! a full proposal of maximum-size transactions.

use crate::handlers::ProposalInbox;
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use qc_12_ordering_service::{
    MetricsSnapshot, OrderingConfig, OrderingHandle, OrderingServiceApi, RegistryUpdate,
    RejectReason, ServiceState,
};
use serde::{Deserialize, Serialize};
use shared_types::{Peer, Proposal, Transaction};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ordering: OrderingHandle,
    pub inbox: Arc<ProposalInbox>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Hex-encoded transaction hash.
    pub hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    /// Whether resubmitting the same transaction later may succeed.
    pub retryable: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PeerListRequest {
    pub peers: Vec<Peer>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub state: ServiceState,
    pub queue_len: usize,
    pub peers: usize,
    pub accepting: bool,
    pub proposals_received: u64,
    /// Highest proposal height received from a peer, 0 if none.
    pub last_received_height: u64,
    pub avg_transactions_per_proposal: f64,
    pub metrics: MetricsSnapshot,
}

/// Rejected submission.
pub struct ApiRejection(pub RejectReason);

impl ApiRejection {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self.0 {
            RejectReason::QueueFull(_) => (StatusCode::SERVICE_UNAVAILABLE, "queue_full"),
            RejectReason::Malformed(_) => (StatusCode::BAD_REQUEST, "malformed"),
            RejectReason::ServiceStopped => (StatusCode::SERVICE_UNAVAILABLE, "service_stopped"),
        }
    }
}

impl IntoResponse for ApiRejection {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = ErrorBody {
            error: code.to_string(),
            message: self.0.to_string(),
            retryable: self.0.is_transient(),
        };
        (status, Json(body)).into_response()
    }
}

/// Slack for JSON framing and signatures, per transaction and per body.
const ENVELOPE_BYTES: usize = 64 * 1024;

/// Largest request body accepted.
///
/// Payloads travel as base64, so a full proposal is about four thirds of
/// `max_batch_size * max_payload_bytes` plus framing.
pub fn request_body_limit(config: &OrderingConfig) -> usize {
    let encoded_payload = config.max_payload_bytes.div_ceil(3) * 4;
    config
        .max_batch_size
        .saturating_mul(encoded_payload.saturating_add(ENVELOPE_BYTES))
        .saturating_add(ENVELOPE_BYTES)
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = request_body_limit(state.ordering.config());
    Router::new()
        .route("/v1/transactions", post(submit_transaction))
        .route("/v1/proposals", post(receive_proposal))
        .route(
            "/v1/peers",
            get(list_peers).put(replace_peers).post(add_peer),
        )
        .route("/v1/peers/:address", delete(remove_peer))
        .route("/v1/status", get(status))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn submit_transaction(
    State(state): State<AppState>,
    Json(tx): Json<Transaction>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiRejection> {
    let hash = hex::encode(tx.hash());
    state.ordering.submit_transaction(tx).map_err(ApiRejection)?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { hash })))
}

async fn receive_proposal(
    State(state): State<AppState>,
    Json(proposal): Json<Proposal>,
) -> StatusCode {
    state.inbox.accept(proposal);
    StatusCode::OK
}

async fn list_peers(State(state): State<AppState>) -> Json<Vec<Peer>> {
    Json(state.ordering.peers())
}

async fn replace_peers(
    State(state): State<AppState>,
    Json(request): Json<PeerListRequest>,
) -> Json<RegistryUpdate> {
    Json(state.ordering.on_peer_list_update(request.peers))
}

/// 201 when added, 409 when the address is already registered.
async fn add_peer(State(state): State<AppState>, Json(peer): Json<Peer>) -> StatusCode {
    if state.ordering.add_peer(peer) {
        StatusCode::CREATED
    } else {
        StatusCode::CONFLICT
    }
}

async fn remove_peer(State(state): State<AppState>, Path(address): Path<String>) -> StatusCode {
    if state.ordering.remove_peer(&address) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let metrics = state.ordering.metrics();
    Json(StatusResponse {
        state: state.ordering.state(),
        queue_len: state.ordering.queue_len(),
        peers: state.ordering.peers().len(),
        accepting: state.ordering.is_accepting(),
        proposals_received: state.inbox.received(),
        last_received_height: state.inbox.last_height(),
        avg_transactions_per_proposal: metrics.avg_transactions_per_proposal(),
        metrics,
    })
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
