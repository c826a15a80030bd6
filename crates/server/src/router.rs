//! HTTP router construction.
//!
//! Assembles all Axum routes, middleware, and OpenAPI docs into a single
//! `Router`. Kept separate from main so tests can drive the exact
//! production router in-process.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health::health))
        .route("/schedules/upcoming", get(api::schedules::upcoming_fires))
        .route(
            "/schedules",
            get(api::schedules::list_schedules).post(api::schedules::create_schedule),
        )
        .route(
            "/schedules/{name}",
            axum::routing::put(api::schedules::update_schedule)
                .delete(api::schedules::delete_schedule),
        )
        .route(
            "/gate",
            get(api::gate::gate_status).post(api::gate::gate_command),
        )
        .route("/gate/heartbeat", post(api::gate::gate_heartbeat))
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
