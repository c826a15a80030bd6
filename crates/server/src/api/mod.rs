//! API endpoint modules.
//!
//! Shared error mapping lives here in mod.rs: every handler returns the
//! same `{"error": "..."}` body shape on failure.

pub mod doc;
pub mod gate;
pub mod health;
pub mod schedules;

use axum::http::StatusCode;
use axum::Json;
use gatehouse_store::StoreError;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);
pub(crate) type ApiResult<T> = Result<T, ApiError>;

/// Map a store failure onto an HTTP status with the shared error body.
pub(crate) fn store_error(e: StoreError) -> ApiError {
    let status = match &e {
        StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

pub(crate) fn bad_request(msg: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: msg.into() }),
    )
}
