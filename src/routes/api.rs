use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::info;

use crate::clients::orchestrator::RequestKey;
use crate::models::views::{BackendStatus, Snapshot};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StatusView {
    pub backend_status: String,
    pub reachable: bool,
    pub detail: BackendStatus,
}

impl From<BackendStatus> for StatusView {
    fn from(status: BackendStatus) -> Self {
        Self {
            backend_status: status.to_string(),
            reachable: status.is_reachable(),
            detail: status,
        }
    }
}

pub async fn handle_state(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.orchestrator.snapshot().await)
}

pub async fn handle_get_slot(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.orchestrator.slot(&id).await {
        Some(slot) => Json(slot).into_response(),
        None => (StatusCode::NOT_FOUND, format!("no slot for {:?}", id)).into_response(),
    }
}

/// Fire-and-forget: the result shows up later in the slot.
pub async fn handle_refresh(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let ticket = state.orchestrator.request(&id);
    info!("refresh requested for '{}' (#{})", id, ticket.key.seq);
    (StatusCode::ACCEPTED, Json(ticket.key)).into_response()
}

pub async fn handle_check_health(State(state): State<AppState>) -> Json<StatusView> {
    Json(state.orchestrator.check_health().await.into())
}

pub async fn handle_in_flight(State(state): State<AppState>) -> Json<Vec<RequestKey>> {
    Json(state.orchestrator.in_flight())
}

pub async fn handle_cancel(
    State(state): State<AppState>,
    Path((id, seq)): Path<(String, u64)>,
) -> StatusCode {
    let key = RequestKey { endpoint: id, seq };
    if state.orchestrator.cancel(&key) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn handle_healthz() -> &'static str {
    "ok\n"
}
