//! PostgreSQL store implementations (sqlx).

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatehouse_core::{ActorKind, GateAction};
use sqlx::PgPool;

use crate::error::StoreError;
use crate::gate_log::{GateHistoryEntry, GateLog, GateStatus, HISTORY_WINDOW};
use crate::schedule::{
    validate_new, validate_update, NewSchedule, Schedule, ScheduleStore, ScheduleUpdate,
};

/// Postgres unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

fn io_error(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

// ── Row types ─────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    name: String,
    recurrence: String,
    action: String,
    enabled: bool,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ScheduleRow> for Schedule {
    type Error = StoreError;

    fn try_from(row: ScheduleRow) -> Result<Self, StoreError> {
        let action = GateAction::from_str(&row.action)
            .map_err(StoreError::Unavailable)?;
        Ok(Schedule {
            name: row.name,
            recurrence: row.recurrence,
            action,
            enabled: row.enabled,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    action: String,
    timestamp_ms: i64,
    actor_kind: String,
    actor_name: Option<String>,
}

impl TryFrom<HistoryRow> for GateHistoryEntry {
    type Error = StoreError;

    fn try_from(row: HistoryRow) -> Result<Self, StoreError> {
        Ok(GateHistoryEntry {
            action: GateAction::from_str(&row.action).map_err(StoreError::Unavailable)?,
            timestamp: row.timestamp_ms,
            actor_kind: ActorKind::from_str(&row.actor_kind)
                .map_err(StoreError::Unavailable)?,
            actor_name: row.actor_name,
        })
    }
}

// ── Schedules ─────────────────────────────────────────────────────

pub struct PgScheduleStore {
    pool: PgPool,
}

impl PgScheduleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduleStore for PgScheduleStore {
    async fn create(&self, new: NewSchedule) -> Result<Schedule, StoreError> {
        validate_new(&new)?;
        let row = sqlx::query_as::<_, ScheduleRow>(
            r#"INSERT INTO schedules (name, recurrence, action, enabled, created_by)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING name, recurrence, action, enabled, created_by, created_at"#,
        )
        .bind(&new.name)
        .bind(&new.recurrence)
        .bind(new.action.as_str())
        .bind(new.enabled)
        .bind(&new.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::Conflict(new.name.clone())
            }
            _ => io_error(e),
        })?;
        row.try_into()
    }

    async fn update(&self, name: &str, update: ScheduleUpdate) -> Result<Schedule, StoreError> {
        validate_update(&update)?;
        let row = sqlx::query_as::<_, ScheduleRow>(
            r#"UPDATE schedules
               SET recurrence = COALESCE($2, recurrence),
                   action     = COALESCE($3, action),
                   enabled    = COALESCE($4, enabled)
               WHERE name = $1
               RETURNING name, recurrence, action, enabled, created_by, created_at"#,
        )
        .bind(name)
        .bind(update.recurrence.as_deref())
        .bind(update.action.map(|a| a.as_str()))
        .bind(update.enabled)
        .fetch_optional(&self.pool)
        .await
        .map_err(io_error)?
        .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        row.try_into()
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM schedules WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(io_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Schedule>, StoreError> {
        let row = sqlx::query_as::<_, ScheduleRow>(
            r#"SELECT name, recurrence, action, enabled, created_by, created_at
               FROM schedules WHERE name = $1"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(io_error)?;
        row.map(Schedule::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Schedule>, StoreError> {
        let rows = sqlx::query_as::<_, ScheduleRow>(
            r#"SELECT name, recurrence, action, enabled, created_by, created_at
               FROM schedules ORDER BY created_at DESC, name ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(io_error)?;
        rows.into_iter().map(Schedule::try_from).collect()
    }
}

// ── Gate log ──────────────────────────────────────────────────────

pub struct PgGateLog {
    pool: PgPool,
}

impl PgGateLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Seed the synthetic system entry and the last-contact row if they
    /// are missing. Idempotent; called once at process start.
    pub async fn ensure_seeded(&self, now_ms: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO gate_history (action, timestamp_ms, actor_kind)
               SELECT 'close', $1, 'system'
               WHERE NOT EXISTS (SELECT 1 FROM gate_history)"#,
        )
        .bind(now_ms)
        .execute(&self.pool)
        .await
        .map_err(io_error)?;

        sqlx::query(
            r#"INSERT INTO last_contact (id, timestamp_ms) VALUES (1, 0)
               ON CONFLICT (id) DO NOTHING"#,
        )
        .execute(&self.pool)
        .await
        .map_err(io_error)?;
        Ok(())
    }
}

#[async_trait]
impl GateLog for PgGateLog {
    async fn append(
        &self,
        action: GateAction,
        timestamp: i64,
        actor_kind: ActorKind,
        actor_name: Option<String>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO gate_history (action, timestamp_ms, actor_kind, actor_name)
               VALUES ($1, $2, $3, $4)"#,
        )
        .bind(action.as_str())
        .bind(timestamp)
        .bind(actor_kind.as_str())
        .bind(actor_name)
        .execute(&self.pool)
        .await
        .map_err(io_error)?;
        Ok(())
    }

    async fn status(&self, include_history: bool) -> Result<GateStatus, StoreError> {
        let latest = sqlx::query_as::<_, HistoryRow>(
            r#"SELECT action, timestamp_ms, actor_kind, actor_name
               FROM gate_history ORDER BY id DESC LIMIT 1"#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(io_error)?
        .ok_or_else(|| StoreError::Unavailable("gate log not seeded".into()))?;
        let latest: GateHistoryEntry = latest.try_into()?;

        let last_contact: (i64,) =
            sqlx::query_as("SELECT timestamp_ms FROM last_contact WHERE id = 1")
                .fetch_one(&self.pool)
                .await
                .map_err(io_error)?;

        let history = if include_history {
            let rows = sqlx::query_as::<_, HistoryRow>(
                r#"SELECT action, timestamp_ms, actor_kind, actor_name
                   FROM gate_history ORDER BY id DESC LIMIT $1"#,
            )
            .bind(HISTORY_WINDOW as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(io_error)?;
            Some(
                rows.into_iter()
                    .map(GateHistoryEntry::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            )
        } else {
            None
        };

        Ok(GateStatus {
            status: latest.action,
            last_contact_timestamp: last_contact.0,
            history,
        })
    }

    async fn heartbeat(&self, timestamp: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE last_contact SET timestamp_ms = $1 WHERE id = 1")
            .bind(timestamp)
            .execute(&self.pool)
            .await
            .map_err(io_error)?;
        Ok(())
    }
}
