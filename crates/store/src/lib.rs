//! Persistence layer: schedule CRUD and the append-only gate log.
//!
//! Both stores are traits with two implementations: an in-memory one
//! (tests, and deployments without Postgres) and a sqlx/Postgres one.
//! Validation happens inside the store, so an unparsable recurrence
//! expression can never be persisted regardless of the caller.

pub mod error;
pub mod gate_log;
pub mod memory;
pub mod pg;
pub mod schedule;

pub use error::StoreError;
pub use gate_log::{GateHistoryEntry, GateLog, GateStatus, HISTORY_WINDOW};
pub use memory::{MemoryGateLog, MemoryScheduleStore};
pub use pg::{PgGateLog, PgScheduleStore};
pub use schedule::{NewSchedule, Schedule, ScheduleStore, ScheduleUpdate};
