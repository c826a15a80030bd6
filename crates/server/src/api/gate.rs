//! Gate status, manual commands, and the heartbeat.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use gatehouse_core::{now_millis, ActorKind, GateAction};
use gatehouse_store::{GateHistoryEntry, GateStatus};
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::state::AppState;

use super::{bad_request, store_error, ApiResult};

#[derive(Debug, Deserialize, IntoParams)]
pub struct StatusParams {
    /// Include the most recent history entries, newest first.
    #[serde(default)]
    pub include_history: bool,
}

/// Manual gate command issued by a person through the UI or API.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GateCommand {
    pub action: GateAction,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct HeartbeatRequest {
    /// Contact time in milliseconds since the Unix epoch; defaults to
    /// the server clock when absent.
    pub timestamp: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/gate",
    tag = "Gate",
    params(StatusParams),
    responses(
        (status = 200, description = "Current gate status, folded from the event log", body = GateStatus)
    )
)]
pub(crate) async fn gate_status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatusParams>,
) -> ApiResult<Json<GateStatus>> {
    let status = state
        .gate_log
        .status(params.include_history)
        .await
        .map_err(store_error)?;
    Ok(Json(status))
}

#[utoipa::path(
    post,
    path = "/gate",
    tag = "Gate",
    request_body = GateCommand,
    params(("x-actor" = Option<String>, Header, description = "Actor name recorded in the gate log")),
    responses(
        (status = 201, description = "Command appended to the gate log", body = GateHistoryEntry),
        (status = 400, description = "Invalid or missing action", body = super::ErrorResponse)
    )
)]
pub(crate) async fn gate_command(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<GateCommand>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<GateHistoryEntry>)> {
    let Json(command) = payload.map_err(|e| bad_request(e.body_text()))?;
    // Actor identity is supplied by the upstream auth layer.
    let actor_name = headers
        .get("x-actor")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let entry = GateHistoryEntry {
        action: command.action,
        timestamp: now_millis(),
        actor_kind: ActorKind::User,
        actor_name,
    };
    state
        .gate_log
        .append(entry.action, entry.timestamp, entry.actor_kind, entry.actor_name.clone())
        .await
        .map_err(store_error)?;
    info!(
        action = %entry.action,
        actor = entry.actor_name.as_deref().unwrap_or("anonymous"),
        "manual gate command"
    );
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    post,
    path = "/gate/heartbeat",
    tag = "Gate",
    request_body = HeartbeatRequest,
    responses(
        (status = 204, description = "Last-contact timestamp updated")
    )
)]
pub(crate) async fn gate_heartbeat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HeartbeatRequest>,
) -> ApiResult<StatusCode> {
    let timestamp = req.timestamp.unwrap_or_else(now_millis);
    state
        .gate_log
        .heartbeat(timestamp)
        .await
        .map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}
