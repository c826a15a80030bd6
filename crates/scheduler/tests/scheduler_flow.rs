//! End-to-end flows through Scheduler, JobRegistry and Executor against
//! the in-memory stores, including real timer fires on every-second
//! recurrences.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use gatehouse_core::{ActorKind, GateAction};
use gatehouse_scheduler::{Scheduler, UpcomingQuery};
use gatehouse_store::{
    GateLog, MemoryGateLog, MemoryScheduleStore, NewSchedule, ScheduleStore, ScheduleUpdate,
    StoreError,
};

fn new_schedule(name: &str, recurrence: &str, action: GateAction, enabled: bool) -> NewSchedule {
    NewSchedule {
        name: name.to_string(),
        recurrence: recurrence.to_string(),
        action,
        enabled,
        created_by: "tests".to_string(),
    }
}

fn setup() -> (Arc<MemoryScheduleStore>, Arc<MemoryGateLog>, Scheduler) {
    let store = Arc::new(MemoryScheduleStore::new());
    let gate_log = Arc::new(MemoryGateLog::new());
    let scheduler = Scheduler::new(store.clone(), gate_log.clone(), Tz::UTC);
    (store, gate_log, scheduler)
}

#[tokio::test]
async fn create_registers_enabled_and_skips_disabled() {
    let (_, _, scheduler) = setup();

    scheduler
        .create(new_schedule("open", "0 6 * * *", GateAction::Open, true))
        .await
        .unwrap();
    scheduler
        .create(new_schedule("paused", "0 7 * * *", GateAction::Open, false))
        .await
        .unwrap();

    assert!(scheduler.is_registered("open").await);
    assert!(!scheduler.is_registered("paused").await);
    assert_eq!(scheduler.registered_count().await, 1);
}

#[tokio::test]
async fn invalid_recurrence_is_rejected_before_any_state_change() {
    let (store, _, scheduler) = setup();

    let err = scheduler
        .create(new_schedule("bad", "not a cron", GateAction::Open, true))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(store.get("bad").await.unwrap().is_none());
    assert_eq!(scheduler.registered_count().await, 0);
}

#[tokio::test]
async fn update_recomputes_registration_from_persisted_state() {
    let (store, _, scheduler) = setup();
    scheduler
        .create(new_schedule("gate", "0 6 * * *", GateAction::Open, true))
        .await
        .unwrap();

    let updated = scheduler
        .update(
            "gate",
            ScheduleUpdate {
                recurrence: Some("0 18 * * *".to_string()),
                action: Some(GateAction::Close),
                enabled: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.recurrence, "0 18 * * *");
    assert_eq!(updated.action, GateAction::Close);

    // The live registration carries the new recurrence and fingerprint.
    let (action, recurrence) = scheduler.registration("gate").await.unwrap();
    assert_eq!(action, GateAction::Close);
    assert_eq!(recurrence, "0 18 * * *");
    assert_eq!(scheduler.registered_count().await, 1);

    // Store and registry agree.
    let stored = store.get("gate").await.unwrap().unwrap();
    assert_eq!(stored.recurrence, "0 18 * * *");
}

#[tokio::test]
async fn rapid_updates_leave_exactly_one_job() {
    let (_, _, scheduler) = setup();
    scheduler
        .create(new_schedule("gate", "0 6 * * *", GateAction::Open, true))
        .await
        .unwrap();

    for hour in 7..=12 {
        scheduler
            .update(
                "gate",
                ScheduleUpdate {
                    recurrence: Some(format!("0 {hour} * * *")),
                    action: None,
                    enabled: None,
                },
            )
            .await
            .unwrap();
    }

    assert_eq!(scheduler.registered_count().await, 1);
    let (_, recurrence) = scheduler.registration("gate").await.unwrap();
    assert_eq!(recurrence, "0 12 * * *");
}

#[tokio::test]
async fn disable_unregisters_and_enable_reregisters() {
    let (_, _, scheduler) = setup();
    scheduler
        .create(new_schedule("gate", "0 6 * * *", GateAction::Open, true))
        .await
        .unwrap();

    scheduler
        .update(
            "gate",
            ScheduleUpdate {
                recurrence: None,
                action: None,
                enabled: Some(false),
            },
        )
        .await
        .unwrap();
    assert!(!scheduler.is_registered("gate").await);

    scheduler
        .update(
            "gate",
            ScheduleUpdate {
                recurrence: None,
                action: None,
                enabled: Some(true),
            },
        )
        .await
        .unwrap();
    assert!(scheduler.is_registered("gate").await);
}

#[tokio::test]
async fn update_unknown_schedule_leaves_registry_untouched() {
    let (_, _, scheduler) = setup();
    scheduler
        .create(new_schedule("gate", "0 6 * * *", GateAction::Open, true))
        .await
        .unwrap();

    let err = scheduler
        .update(
            "ghost",
            ScheduleUpdate {
                recurrence: None,
                action: None,
                enabled: Some(false),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert_eq!(scheduler.registered_count().await, 1);
}

#[tokio::test]
async fn delete_unregisters_and_removes() {
    let (store, _, scheduler) = setup();
    scheduler
        .create(new_schedule("gate", "0 6 * * *", GateAction::Open, true))
        .await
        .unwrap();

    scheduler.delete("gate").await.unwrap();
    assert!(!scheduler.is_registered("gate").await);
    assert!(store.get("gate").await.unwrap().is_none());

    let err = scheduler.delete("gate").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn bootstrap_registers_enabled_schedules_and_is_idempotent() {
    let store = Arc::new(MemoryScheduleStore::new());
    let gate_log = Arc::new(MemoryGateLog::new());

    // Pre-populate the store directly, as a previous process would have.
    store
        .create(new_schedule("a", "0 6 * * *", GateAction::Open, true))
        .await
        .unwrap();
    store
        .create(new_schedule("b", "0 18 * * *", GateAction::Close, true))
        .await
        .unwrap();
    store
        .create(new_schedule("c", "0 12 * * *", GateAction::Open, false))
        .await
        .unwrap();

    let scheduler = Scheduler::new(store, gate_log, Tz::UTC);
    assert_eq!(scheduler.bootstrap().await.unwrap(), 2);
    assert_eq!(scheduler.registered_count().await, 2);
    assert!(!scheduler.is_registered("c").await);

    // A second bootstrap replaces rather than duplicates.
    assert_eq!(scheduler.bootstrap().await.unwrap(), 2);
    assert_eq!(scheduler.registered_count().await, 2);
}

#[tokio::test]
async fn timer_fires_and_appends_schedule_entry() {
    let (_, gate_log, scheduler) = setup();

    // Six-field expression: every second.
    scheduler
        .create(new_schedule(
            "tick-close",
            "* * * * * *",
            GateAction::Close,
            true,
        ))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2200)).await;
    scheduler.shutdown().await;

    let status = gate_log.status(true).await.unwrap();
    assert_eq!(status.status, GateAction::Close);
    let history = status.history.unwrap();
    let fired: Vec<_> = history
        .iter()
        .filter(|e| e.actor_kind == ActorKind::Schedule)
        .collect();
    assert!(!fired.is_empty(), "expected at least one timer fire");
    assert!(fired
        .iter()
        .all(|e| e.actor_name.as_deref() == Some("tick-close") && e.action == GateAction::Close));
}

#[tokio::test]
async fn superseded_registration_never_fires_its_old_action() {
    let (_, gate_log, scheduler) = setup();

    scheduler
        .create(new_schedule(
            "tick",
            "* * * * * *",
            GateAction::Open,
            true,
        ))
        .await
        .unwrap();
    // Flip the action immediately; the old every-second job is aborted
    // and replaced before its first fire completes.
    scheduler
        .update(
            "tick",
            ScheduleUpdate {
                recurrence: None,
                action: Some(GateAction::Close),
                enabled: None,
            },
        )
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2200)).await;
    scheduler.shutdown().await;

    let status = gate_log.status(true).await.unwrap();
    let history = status.history.unwrap();
    assert!(history
        .iter()
        .filter(|e| e.actor_kind == ActorKind::Schedule)
        .all(|e| e.action == GateAction::Close));
}

#[tokio::test]
async fn deleted_schedule_stops_firing() {
    let (_, gate_log, scheduler) = setup();

    scheduler
        .create(new_schedule(
            "tick",
            "* * * * * *",
            GateAction::Open,
            true,
        ))
        .await
        .unwrap();
    scheduler.delete("tick").await.unwrap();

    tokio::time::sleep(Duration::from_millis(2200)).await;

    let status = gate_log.status(true).await.unwrap();
    let history = status.history.unwrap();
    assert!(history
        .iter()
        .all(|e| e.actor_kind != ActorKind::Schedule));
}

#[tokio::test]
async fn upcoming_projection_tracks_scheduler_mutations() {
    let (store, _, scheduler) = setup();
    let query = UpcomingQuery::new(store, Tz::UTC);
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    scheduler
        .create(new_schedule(
            "evening-close",
            "0 18 * * *",
            GateAction::Close,
            true,
        ))
        .await
        .unwrap();
    scheduler
        .create(new_schedule(
            "morning-open",
            "0 6 * * *",
            GateAction::Open,
            true,
        ))
        .await
        .unwrap();

    let fires = query.list_at(10, now).await.unwrap();
    assert_eq!(fires.len(), 2);
    assert_eq!(fires[0].schedule.name, "morning-open");
    assert_eq!(
        fires[0].next_fire,
        Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap()
    );
    assert_eq!(fires[1].schedule.name, "evening-close");

    scheduler
        .update(
            "morning-open",
            ScheduleUpdate {
                recurrence: None,
                action: None,
                enabled: Some(false),
            },
        )
        .await
        .unwrap();

    let fires = query.list_at(10, now).await.unwrap();
    assert_eq!(fires.len(), 1);
    assert_eq!(fires[0].schedule.name, "evening-close");

    scheduler.shutdown().await;
}
