//! In-memory store implementations.
//!
//! Used by tests and by deployments without Postgres configured. State
//! does not survive a restart, which is exactly the situation the
//! scheduler's bootstrap-from-store rebuild exists for.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use gatehouse_core::{types::now_millis, ActorKind, GateAction};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::gate_log::{GateHistoryEntry, GateLog, GateStatus, HISTORY_WINDOW};
use crate::schedule::{
    validate_new, validate_update, NewSchedule, Schedule, ScheduleStore, ScheduleUpdate,
};

// ── Schedules ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryScheduleStore {
    schedules: RwLock<HashMap<String, Schedule>>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for MemoryScheduleStore {
    async fn create(&self, new: NewSchedule) -> Result<Schedule, StoreError> {
        validate_new(&new)?;
        let mut guard = self.schedules.write().await;
        if guard.contains_key(&new.name) {
            return Err(StoreError::Conflict(new.name));
        }
        let schedule = Schedule {
            name: new.name.clone(),
            recurrence: new.recurrence,
            action: new.action,
            enabled: new.enabled,
            created_by: new.created_by,
            created_at: Utc::now(),
        };
        guard.insert(new.name, schedule.clone());
        Ok(schedule)
    }

    async fn update(&self, name: &str, update: ScheduleUpdate) -> Result<Schedule, StoreError> {
        validate_update(&update)?;
        let mut guard = self.schedules.write().await;
        let schedule = guard
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        if let Some(recurrence) = update.recurrence {
            schedule.recurrence = recurrence;
        }
        if let Some(action) = update.action {
            schedule.action = action;
        }
        if let Some(enabled) = update.enabled {
            schedule.enabled = enabled;
        }
        Ok(schedule.clone())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut guard = self.schedules.write().await;
        guard
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn get(&self, name: &str) -> Result<Option<Schedule>, StoreError> {
        Ok(self.schedules.read().await.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<Schedule>, StoreError> {
        let guard = self.schedules.read().await;
        let mut all: Vec<Schedule> = guard.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.name.cmp(&b.name)));
        Ok(all)
    }
}

// ── Gate log ──────────────────────────────────────────────────────

struct GateLogInner {
    history: Vec<GateHistoryEntry>,
    last_contact: i64,
}

pub struct MemoryGateLog {
    inner: RwLock<GateLogInner>,
}

impl MemoryGateLog {
    /// Seeds the synthetic system entry so current status is never
    /// undefined.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(GateLogInner {
                history: vec![GateHistoryEntry {
                    action: GateAction::Close,
                    timestamp: now_millis(),
                    actor_kind: ActorKind::System,
                    actor_name: None,
                }],
                last_contact: 0,
            }),
        }
    }
}

impl Default for MemoryGateLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GateLog for MemoryGateLog {
    async fn append(
        &self,
        action: GateAction,
        timestamp: i64,
        actor_kind: ActorKind,
        actor_name: Option<String>,
    ) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.history.push(GateHistoryEntry {
            action,
            timestamp,
            actor_kind,
            actor_name,
        });
        Ok(())
    }

    async fn status(&self, include_history: bool) -> Result<GateStatus, StoreError> {
        let guard = self.inner.read().await;
        // Seeded in the constructor; the log is never empty.
        let latest = guard
            .history
            .last()
            .ok_or_else(|| StoreError::Unavailable("gate log not seeded".into()))?;
        let history = include_history.then(|| {
            guard
                .history
                .iter()
                .rev()
                .take(HISTORY_WINDOW)
                .cloned()
                .collect()
        });
        Ok(GateStatus {
            status: latest.action,
            last_contact_timestamp: guard.last_contact,
            history,
        })
    }

    async fn heartbeat(&self, timestamp: i64) -> Result<(), StoreError> {
        self.inner.write().await.last_contact = timestamp;
        Ok(())
    }
}
