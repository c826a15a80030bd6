//! Fire-time callback with store re-validation and bounded retry.

use std::sync::Arc;
use std::time::Duration;

use gatehouse_core::{types::now_millis, ActorKind, GateAction};
use gatehouse_store::{GateLog, ScheduleStore, StoreError};
use tracing::{debug, warn};

/// Retry budget for transient store failures during a fire.
const MAX_ATTEMPTS: u32 = 4;
const BACKOFF_BASE_MS: u64 = 200;
const BACKOFF_CAP: Duration = Duration::from_secs(5);
/// Upper bound on one attempt's store I/O; a hung backend counts as a
/// transient failure.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// What a fire did. Only `Applied` touches the gate log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// The action was appended to the gate log.
    Applied,
    /// The schedule no longer exists; the caller should drop any
    /// lingering handle.
    ScheduleGone,
    /// The persisted action differs from the one captured at
    /// registration time: the schedule was edited after this occurrence
    /// was queued.
    StaleAction,
    /// Transient failures exhausted the retry budget; the fire was
    /// dropped.
    Dropped,
}

/// Executes schedule fires. Holds no registration lock and no job state:
/// the same path serves in-process timers and an at-least-once queue
/// consumer, because every decision re-reads the store by identity.
pub struct Executor {
    store: Arc<dyn ScheduleStore>,
    gate_log: Arc<dyn GateLog>,
}

impl Executor {
    pub fn new(store: Arc<dyn ScheduleStore>, gate_log: Arc<dyn GateLog>) -> Self {
        Self { store, gate_log }
    }

    /// Run one fire for `name`. `captured_action` is the action recorded
    /// when the job was scheduled; it is compared against the persisted
    /// action, never acted on directly.
    ///
    /// Note: `enabled` is not re-checked here. A disable that leaves the
    /// action unchanged can still fire once for an occurrence already in
    /// flight; the action fingerprint is the staleness check.
    pub async fn fire(&self, name: &str, captured_action: GateAction) -> FireOutcome {
        for attempt in 0..MAX_ATTEMPTS {
            let attempt_result = tokio::time::timeout(
                ATTEMPT_TIMEOUT,
                self.try_fire(name, captured_action),
            )
            .await
            .unwrap_or_else(|_| {
                Err(StoreError::Unavailable("store operation timed out".into()))
            });
            match attempt_result {
                Ok(outcome) => {
                    match outcome {
                        FireOutcome::Applied => {
                            debug!(name = %name, action = %captured_action, "schedule fired");
                        }
                        FireOutcome::ScheduleGone => {
                            debug!(name = %name, "fired for a schedule that no longer exists");
                        }
                        FireOutcome::StaleAction => {
                            warn!(name = %name, "stale fire: persisted action changed since registration");
                        }
                        FireOutcome::Dropped => {}
                    }
                    return outcome;
                }
                Err(e) if e.is_transient() && attempt + 1 < MAX_ATTEMPTS => {
                    // Exponential backoff on transient errors (capped).
                    let backoff = Duration::from_millis(BACKOFF_BASE_MS * 2u64.pow(attempt))
                        .min(BACKOFF_CAP);
                    debug!(
                        name = %name,
                        error = %e,
                        attempt = attempt + 1,
                        "transient failure during fire, retrying in {:?}",
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    warn!(name = %name, error = %e, "dropping fire after repeated failures");
                    return FireOutcome::Dropped;
                }
            }
        }
        FireOutcome::Dropped
    }

    async fn try_fire(
        &self,
        name: &str,
        captured_action: GateAction,
    ) -> Result<FireOutcome, StoreError> {
        // Re-fetch by identity; the captured value is never trusted.
        let schedule = match self.store.get(name).await? {
            Some(s) => s,
            None => return Ok(FireOutcome::ScheduleGone),
        };
        if schedule.action != captured_action {
            return Ok(FireOutcome::StaleAction);
        }
        self.gate_log
            .append(
                schedule.action,
                now_millis(),
                ActorKind::Schedule,
                Some(name.to_string()),
            )
            .await?;
        Ok(FireOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gatehouse_store::{
        MemoryGateLog, MemoryScheduleStore, NewSchedule, Schedule, ScheduleUpdate,
    };
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn seeded(name: &str, action: GateAction) -> Arc<MemoryScheduleStore> {
        let store = Arc::new(MemoryScheduleStore::new());
        store
            .create(NewSchedule {
                name: name.to_string(),
                recurrence: "0 18 * * *".to_string(),
                action,
                enabled: true,
                created_by: "alice".to_string(),
            })
            .await
            .unwrap();
        store
    }

    async fn history_len(log: &MemoryGateLog) -> usize {
        log.status(true).await.unwrap().history.unwrap().len()
    }

    #[tokio::test]
    async fn matching_fire_appends_schedule_entry() {
        let store = seeded("evening-close", GateAction::Close).await;
        let log = Arc::new(MemoryGateLog::new());
        let executor = Executor::new(store, log.clone());

        let outcome = executor.fire("evening-close", GateAction::Close).await;
        assert_eq!(outcome, FireOutcome::Applied);

        let status = log.status(true).await.unwrap();
        assert_eq!(status.status, GateAction::Close);
        let latest = &status.history.unwrap()[0];
        assert_eq!(latest.actor_kind, ActorKind::Schedule);
        assert_eq!(latest.actor_name.as_deref(), Some("evening-close"));
    }

    #[tokio::test]
    async fn stale_action_fire_appends_nothing() {
        let store = seeded("edited", GateAction::Close).await;
        let log = Arc::new(MemoryGateLog::new());
        let executor = Executor::new(store.clone(), log.clone());

        // Edited after the job was queued: captured Open, persisted Close.
        let outcome = executor.fire("edited", GateAction::Open).await;
        assert_eq!(outcome, FireOutcome::StaleAction);
        assert_eq!(history_len(&log).await, 1); // only the seed entry
    }

    #[tokio::test]
    async fn missing_schedule_fire_appends_nothing() {
        let store = Arc::new(MemoryScheduleStore::new());
        let log = Arc::new(MemoryGateLog::new());
        let executor = Executor::new(store, log.clone());

        let outcome = executor.fire("ghost", GateAction::Open).await;
        assert_eq!(outcome, FireOutcome::ScheduleGone);
        assert_eq!(history_len(&log).await, 1);
    }

    #[tokio::test]
    async fn disabled_schedule_with_unchanged_action_still_fires() {
        let store = seeded("soft-off", GateAction::Open).await;
        store
            .update(
                "soft-off",
                ScheduleUpdate {
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let log = Arc::new(MemoryGateLog::new());
        let executor = Executor::new(store, log.clone());

        // Known accepted gap: only the action fingerprint is checked.
        let outcome = executor.fire("soft-off", GateAction::Open).await;
        assert_eq!(outcome, FireOutcome::Applied);
    }

    /// Store wrapper that fails the first `failures` reads.
    struct FlakyStore {
        inner: Arc<MemoryScheduleStore>,
        remaining: AtomicU32,
    }

    #[async_trait]
    impl ScheduleStore for FlakyStore {
        async fn create(&self, new: NewSchedule) -> Result<Schedule, StoreError> {
            self.inner.create(new).await
        }
        async fn update(&self, name: &str, u: ScheduleUpdate) -> Result<Schedule, StoreError> {
            self.inner.update(name, u).await
        }
        async fn delete(&self, name: &str) -> Result<(), StoreError> {
            self.inner.delete(name).await
        }
        async fn get(&self, name: &str) -> Result<Option<Schedule>, StoreError> {
            if self
                .remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::Unavailable("connection reset".into()));
            }
            self.inner.get(name).await
        }
        async fn list(&self) -> Result<Vec<Schedule>, StoreError> {
            self.inner.list().await
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried_with_backoff() {
        let inner = seeded("flaky", GateAction::Open).await;
        let store = Arc::new(FlakyStore {
            inner,
            remaining: AtomicU32::new(2),
        });
        let log = Arc::new(MemoryGateLog::new());
        let executor = Executor::new(store, log.clone());

        let outcome = executor.fire("flaky", GateAction::Open).await;
        assert_eq!(outcome, FireOutcome::Applied);
        assert_eq!(history_len(&log).await, 2);
    }

    #[tokio::test]
    async fn exhausted_retries_drop_the_fire() {
        let inner = seeded("down", GateAction::Open).await;
        let store = Arc::new(FlakyStore {
            inner,
            remaining: AtomicU32::new(u32::MAX),
        });
        let log = Arc::new(MemoryGateLog::new());
        let executor = Executor::new(store, log.clone());

        let outcome = executor.fire("down", GateAction::Open).await;
        assert_eq!(outcome, FireOutcome::Dropped);
        assert_eq!(history_len(&log).await, 1);
    }
}
