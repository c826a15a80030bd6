use std::sync::Arc;

use chrono_tz::Tz;
use gatehouse_scheduler::{Scheduler, UpcomingQuery};
use gatehouse_store::{GateLog, ScheduleStore};

pub struct AppState {
    pub store: Arc<dyn ScheduleStore>,
    pub gate_log: Arc<dyn GateLog>,
    pub scheduler: Arc<Scheduler>,
    pub upcoming: UpcomingQuery,
    /// Wall-clock timezone recurrence expressions are interpreted in.
    pub timezone: Tz,
}

impl AppState {
    pub fn new(store: Arc<dyn ScheduleStore>, gate_log: Arc<dyn GateLog>, timezone: Tz) -> Self {
        let scheduler = Arc::new(Scheduler::new(store.clone(), gate_log.clone(), timezone));
        let upcoming = UpcomingQuery::new(store.clone(), timezone);
        Self {
            store,
            gate_log,
            scheduler,
            upcoming,
            timezone,
        }
    }
}
