//! Registration state machine around the store and the job registry.

use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use gatehouse_store::{GateLog, NewSchedule, Schedule, ScheduleStore, ScheduleUpdate, StoreError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::executor::{Executor, FireOutcome};
use crate::registry::{JobHandle, JobRegistry};

/// Orchestrates schedule mutations: persists through the store, then
/// reconciles the registry. Per-identity registration is serialized by
/// one async mutex, so "cancel old, start new" cannot interleave with
/// itself; the Executor's staleness check covers the in-flight fire that
/// mutual exclusion cannot retract.
pub struct Scheduler {
    store: Arc<dyn ScheduleStore>,
    executor: Arc<Executor>,
    registry: Arc<Mutex<JobRegistry>>,
    tz: Tz,
}

impl Scheduler {
    pub fn new(store: Arc<dyn ScheduleStore>, gate_log: Arc<dyn GateLog>, tz: Tz) -> Self {
        let executor = Arc::new(Executor::new(store.clone(), gate_log));
        Self {
            store,
            executor,
            registry: Arc::new(Mutex::new(JobRegistry::new())),
            tz,
        }
    }

    /// Persist a new schedule and register it if enabled. Validation
    /// happens in the store, before persistence and before any registry
    /// change.
    pub async fn create(&self, new: NewSchedule) -> Result<Schedule, StoreError> {
        let schedule = self.store.create(new).await?;
        if schedule.enabled {
            let mut registry = self.registry.lock().await;
            self.register_locked(&mut registry, &schedule);
        }
        info!(name = %schedule.name, enabled = schedule.enabled, "schedule created");
        Ok(schedule)
    }

    /// Merge a partial update. The existing handle is unregistered before
    /// the store is touched, then registration is recomputed from the
    /// persisted result — the only order that cannot race a changed
    /// recurrence or action against a stale job.
    pub async fn update(&self, name: &str, update: ScheduleUpdate) -> Result<Schedule, StoreError> {
        // Reject bad input before mutating anything.
        if let Some(ref expr) = update.recurrence {
            gatehouse_recurrence::validate(expr)?;
        }

        let mut registry = self.registry.lock().await;
        if self.store.get(name).await?.is_none() {
            return Err(StoreError::NotFound(name.to_string()));
        }

        registry.remove(name);
        let updated = self.store.update(name, update).await?;
        if updated.enabled {
            self.register_locked(&mut registry, &updated);
        }
        info!(name = %name, enabled = updated.enabled, "schedule updated");
        Ok(updated)
    }

    /// Unregister, then remove from the store.
    pub async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut registry = self.registry.lock().await;
        if self.store.get(name).await?.is_none() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        registry.remove(name);
        self.store.delete(name).await?;
        info!(name = %name, "schedule deleted");
        Ok(())
    }

    /// Rebuild the registry in full from the store. Safe to call more
    /// than once: each enabled schedule is unregistered before being
    /// registered, so repeated calls leave exactly one live job each.
    pub async fn bootstrap(&self) -> Result<usize, StoreError> {
        let schedules = self.store.list().await?;
        let mut registry = self.registry.lock().await;
        let mut registered = 0;
        for schedule in &schedules {
            registry.remove(&schedule.name);
            if schedule.enabled {
                self.register_locked(&mut registry, schedule);
                registered += 1;
            }
        }
        info!(
            total = schedules.len(),
            registered, "scheduler bootstrapped from store"
        );
        Ok(registered)
    }

    /// Abort every live job (process shutdown).
    pub async fn shutdown(&self) {
        self.registry.lock().await.clear();
    }

    // ── Introspection ─────────────────────────────────────────────

    pub async fn registered_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    pub async fn is_registered(&self, name: &str) -> bool {
        self.registry.lock().await.contains(name)
    }

    /// Registration snapshot (action fingerprint, recurrence) for a live
    /// job, if any.
    pub async fn registration(&self, name: &str) -> Option<(gatehouse_core::GateAction, String)> {
        self.registry
            .lock()
            .await
            .get(name)
            .map(|h| (h.action, h.recurrence.clone()))
    }

    // ── Internals ─────────────────────────────────────────────────

    /// Register under an already-held registry lock. `insert` aborts any
    /// replaced handle, so double registration is impossible.
    fn register_locked(&self, registry: &mut JobRegistry, schedule: &Schedule) {
        let task = self.spawn_timer(schedule);
        registry.insert(
            schedule.name.clone(),
            JobHandle::new(task, schedule.action, schedule.recurrence.clone()),
        );
        debug!(
            name = %schedule.name,
            recurrence = %schedule.recurrence,
            action = %schedule.action,
            "job registered"
        );
    }

    /// One timer task per registered schedule: compute the next fire,
    /// sleep until it, run the Executor, repeat. The task never takes the
    /// registry lock while sleeping or doing store I/O.
    fn spawn_timer(&self, schedule: &Schedule) -> JoinHandle<()> {
        let name = schedule.name.clone();
        let expr = schedule.recurrence.clone();
        let action = schedule.action;
        let tz = self.tz;
        let executor = self.executor.clone();
        let registry = self.registry.clone();

        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = match gatehouse_recurrence::next_fire_time(&expr, tz, now) {
                    Ok(Some(next)) => next,
                    Ok(None) => {
                        debug!(name = %name, "recurrence has no future occurrence, timer exiting");
                        break;
                    }
                    Err(e) => {
                        // Unreachable for store-validated expressions.
                        warn!(name = %name, error = %e, "unparsable recurrence at fire time");
                        break;
                    }
                };
                let wait = (next - now).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;

                if executor.fire(&name, action).await == FireOutcome::ScheduleGone {
                    // Deleted out from under us: drop the lingering handle.
                    registry.lock().await.remove(&name);
                    break;
                }
            }
        })
    }
}
