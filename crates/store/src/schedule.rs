//! Schedule model and the [`ScheduleStore`] trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatehouse_core::GateAction;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A named rule binding a recurrence expression to a gate action.
///
/// `name` is the identity: unique and immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Schedule {
    pub name: String,
    /// 5-field cron expression, always parsable (enforced on write).
    pub recurrence: String,
    pub action: GateAction,
    pub enabled: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Creation payload. `created_at` is assigned by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSchedule {
    pub name: String,
    pub recurrence: String,
    pub action: GateAction,
    pub enabled: bool,
    pub created_by: String,
}

/// Partial update. Absent fields are left unchanged; `name`, `created_by`
/// and `created_at` are immutable.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct ScheduleUpdate {
    pub recurrence: Option<String>,
    pub action: Option<GateAction>,
    pub enabled: Option<bool>,
}

/// Validate a creation payload before any persistence.
pub(crate) fn validate_new(new: &NewSchedule) -> Result<(), StoreError> {
    if new.name.trim().is_empty() {
        return Err(StoreError::Validation("schedule name must not be empty".into()));
    }
    gatehouse_recurrence::validate(&new.recurrence)?;
    Ok(())
}

/// Validate an update payload before any persistence.
pub(crate) fn validate_update(update: &ScheduleUpdate) -> Result<(), StoreError> {
    if let Some(ref expr) = update.recurrence {
        gatehouse_recurrence::validate(expr)?;
    }
    Ok(())
}

/// Persisted CRUD for schedules. The store is the sole writer of
/// persisted fields and owns identity uniqueness.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Persist a new schedule. Validation strictly precedes persistence.
    async fn create(&self, new: NewSchedule) -> Result<Schedule, StoreError>;

    /// Merge `update` into an existing schedule.
    async fn update(&self, name: &str, update: ScheduleUpdate) -> Result<Schedule, StoreError>;

    /// Remove a schedule.
    async fn delete(&self, name: &str) -> Result<(), StoreError>;

    /// Fetch by identity. Absence is not an error here; fire-time callers
    /// treat it as an expected race.
    async fn get(&self, name: &str) -> Result<Option<Schedule>, StoreError>;

    /// All schedules, newest first.
    async fn list(&self) -> Result<Vec<Schedule>, StoreError>;
}
