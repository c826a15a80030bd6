//! Append-only gate history plus the decoupled heartbeat timestamp.

use async_trait::async_trait;
use gatehouse_core::{ActorKind, GateAction};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// How many history entries `status(include_history = true)` returns.
/// Entries beyond the window are not retrievable through that call.
pub const HISTORY_WINDOW: usize = 50;

/// One appended gate event. Immutable; the log is never rewritten or
/// compacted.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GateHistoryEntry {
    pub action: GateAction,
    /// Wall-clock milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub actor_kind: ActorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_name: Option<String>,
}

/// Derived gate state. Never stored: `status` is always a fold over the
/// log, so a cached column can never diverge from the audit trail.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct GateStatus {
    pub status: GateAction,
    /// Last-write-wins heartbeat timestamp (millis), independent of the
    /// history log. A gate with no recent history can still have recent
    /// contact, and vice versa.
    pub last_contact_timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<GateHistoryEntry>>,
}

#[async_trait]
pub trait GateLog: Send + Sync {
    /// Pure insert. No compaction, no cached-current update.
    async fn append(
        &self,
        action: GateAction,
        timestamp: i64,
        actor_kind: ActorKind,
        actor_name: Option<String>,
    ) -> Result<(), StoreError>;

    /// Current status (fold over the log) and optionally the most recent
    /// entries, newest first, capped at [`HISTORY_WINDOW`].
    ///
    /// The log is seeded with one synthetic system entry at first start,
    /// so the fold is never over an empty log.
    async fn status(&self, include_history: bool) -> Result<GateStatus, StoreError>;

    /// Update only the last-contact timestamp. Independent write path
    /// from `append`.
    async fn heartbeat(&self, timestamp: i64) -> Result<(), StoreError>;
}
