//! Read-only projection of the next fires across enabled schedules.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use gatehouse_store::{Schedule, ScheduleStore, StoreError};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

/// One projected fire: the schedule and its next occurrence.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpcomingFire {
    #[serde(flatten)]
    pub schedule: Schedule,
    pub next_fire: DateTime<Utc>,
}

/// Computes the upcoming-fires view. Recomputed from the store on every
/// call, never cached, so it reflects mutations immediately.
pub struct UpcomingQuery {
    store: Arc<dyn ScheduleStore>,
    tz: Tz,
}

impl UpcomingQuery {
    pub fn new(store: Arc<dyn ScheduleStore>, tz: Tz) -> Self {
        Self { store, tz }
    }

    /// The next `limit` fires from now, ascending by fire time.
    pub async fn list(&self, limit: usize) -> Result<Vec<UpcomingFire>, StoreError> {
        self.list_at(limit, Utc::now()).await
    }

    /// Same projection anchored at an explicit instant. Disabled
    /// schedules and schedules with no occurrence strictly after `now`
    /// are excluded.
    pub async fn list_at(
        &self,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<UpcomingFire>, StoreError> {
        let mut fires: Vec<UpcomingFire> = Vec::new();
        for schedule in self.store.list().await? {
            if !schedule.enabled {
                continue;
            }
            match gatehouse_recurrence::next_fire_time(&schedule.recurrence, self.tz, now) {
                Ok(Some(next_fire)) => fires.push(UpcomingFire {
                    schedule,
                    next_fire,
                }),
                Ok(None) => {}
                Err(e) => {
                    // Store-validated expressions should never land here.
                    warn!(name = %schedule.name, error = %e, "skipping unparsable recurrence");
                }
            }
        }
        fires.sort_by(|a, b| {
            a.next_fire
                .cmp(&b.next_fire)
                .then_with(|| a.schedule.name.cmp(&b.schedule.name))
        });
        fires.truncate(limit);
        Ok(fires)
    }
}
