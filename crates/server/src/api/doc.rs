//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI spec, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "gatehouse API",
        version = "0.1.0",
        description = "Schedule-driven gate controller: cron recurrences bound to open/close actions, with an append-only gate event log.",
    ),
    tags(
        (name = "Health", description = "Server readiness"),
        (name = "Schedules", description = "Schedule CRUD and the upcoming-fires projection"),
        (name = "Gate", description = "Gate status, manual commands, and the heartbeat"),
    ),
    paths(
        crate::api::health::health,
        crate::api::schedules::list_schedules,
        crate::api::schedules::create_schedule,
        crate::api::schedules::update_schedule,
        crate::api::schedules::delete_schedule,
        crate::api::schedules::upcoming_fires,
        crate::api::gate::gate_status,
        crate::api::gate::gate_command,
        crate::api::gate::gate_heartbeat,
    ),
    components(schemas(
        crate::api::ErrorResponse,
        crate::api::health::HealthResponse,
        crate::api::gate::GateCommand,
        crate::api::gate::HeartbeatRequest,
        crate::api::schedules::CreateScheduleRequest,
        gatehouse_store::Schedule,
        gatehouse_store::ScheduleUpdate,
        gatehouse_store::GateStatus,
        gatehouse_store::GateHistoryEntry,
        gatehouse_scheduler::UpcomingFire,
        gatehouse_core::GateAction,
        gatehouse_core::ActorKind,
    ))
)]
pub struct ApiDoc;
