//! Schedule CRUD and the upcoming-fires projection.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use gatehouse_core::GateAction;
use gatehouse_scheduler::UpcomingFire;
use gatehouse_store::{NewSchedule, Schedule, ScheduleUpdate};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::state::AppState;

use super::{bad_request, store_error, ApiResult};

const DEFAULT_UPCOMING_LIMIT: usize = 10;
const MAX_UPCOMING_LIMIT: usize = 100;

#[derive(Debug, Deserialize, IntoParams)]
pub struct UpcomingParams {
    /// How many fires to return (default 10, max 100).
    pub limit: Option<usize>,
}

/// Creation payload. The creator is not part of the body; it arrives
/// from the upstream auth layer via the `x-actor` header.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateScheduleRequest {
    pub name: String,
    pub recurrence: String,
    pub action: GateAction,
    pub enabled: bool,
}

#[utoipa::path(
    get,
    path = "/schedules",
    tag = "Schedules",
    responses(
        (status = 200, description = "All schedules, newest first", body = Vec<Schedule>)
    )
)]
pub(crate) async fn list_schedules(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Schedule>>> {
    let schedules = state.store.list().await.map_err(store_error)?;
    Ok(Json(schedules))
}

#[utoipa::path(
    post,
    path = "/schedules",
    tag = "Schedules",
    request_body = CreateScheduleRequest,
    params(("x-actor" = Option<String>, Header, description = "Creator name recorded on the schedule")),
    responses(
        (status = 201, description = "Schedule created and registered", body = Schedule),
        (status = 400, description = "Invalid recurrence, action, or missing field", body = super::ErrorResponse),
        (status = 409, description = "Schedule name already exists", body = super::ErrorResponse)
    )
)]
pub(crate) async fn create_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CreateScheduleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Schedule>)> {
    let Json(req) = payload.map_err(|e| bad_request(e.body_text()))?;
    let created_by = actor_name(&headers);
    let schedule = state
        .scheduler
        .create(NewSchedule {
            name: req.name,
            recurrence: req.recurrence,
            action: req.action,
            enabled: req.enabled,
            created_by,
        })
        .await
        .map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// Creator identity from the auth layer's `x-actor` header.
fn actor_name(headers: &HeaderMap) -> String {
    headers
        .get("x-actor")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string()
}

#[utoipa::path(
    put,
    path = "/schedules/{name}",
    tag = "Schedules",
    params(("name" = String, Path, description = "Schedule identity")),
    request_body = ScheduleUpdate,
    responses(
        (status = 200, description = "Updated schedule", body = Schedule),
        (status = 400, description = "Invalid recurrence or action", body = super::ErrorResponse),
        (status = 404, description = "Unknown schedule", body = super::ErrorResponse)
    )
)]
pub(crate) async fn update_schedule(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    payload: Result<Json<ScheduleUpdate>, JsonRejection>,
) -> ApiResult<Json<Schedule>> {
    let Json(update) = payload.map_err(|e| bad_request(e.body_text()))?;
    let schedule = state
        .scheduler
        .update(&name, update)
        .await
        .map_err(store_error)?;
    Ok(Json(schedule))
}

#[utoipa::path(
    delete,
    path = "/schedules/{name}",
    tag = "Schedules",
    params(("name" = String, Path, description = "Schedule identity")),
    responses(
        (status = 204, description = "Schedule deleted and unregistered"),
        (status = 404, description = "Unknown schedule", body = super::ErrorResponse)
    )
)]
pub(crate) async fn delete_schedule(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    state.scheduler.delete(&name).await.map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/schedules/upcoming",
    tag = "Schedules",
    params(UpcomingParams),
    responses(
        (status = 200, description = "Next fires across enabled schedules, ascending", body = Vec<UpcomingFire>),
        (status = 400, description = "Limit out of range", body = super::ErrorResponse)
    )
)]
pub(crate) async fn upcoming_fires(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UpcomingParams>,
) -> ApiResult<Json<Vec<UpcomingFire>>> {
    let limit = params.limit.unwrap_or(DEFAULT_UPCOMING_LIMIT);
    if limit == 0 || limit > MAX_UPCOMING_LIMIT {
        return Err(bad_request(format!(
            "limit must be between 1 and {MAX_UPCOMING_LIMIT}"
        )));
    }
    let fires = state.upcoming.list(limit).await.map_err(store_error)?;
    Ok(Json(fires))
}
