//! Schedule-driven trigger engine.
//!
//! This crate provides:
//! - [`JobRegistry`] — runtime map from a schedule's identity to its live
//!   timer handle, rebuilt in full from the store at every process start
//! - [`Scheduler`] — the registration state machine around the store and
//!   the registry (create/update/delete/bootstrap)
//! - [`Executor`] — the fire-time callback; re-validates against the
//!   store before producing the one externally visible effect, a gate
//!   log append
//! - [`UpcomingQuery`] — read-only projection of the next N fire times
//!
//! The Executor's re-validation is the load-bearing safety mechanism:
//! captured registration data is only a staleness fingerprint, never the
//! decision input, so the same fire path stays correct when timers are
//! replaced by an at-least-once distributed job queue.

pub mod executor;
pub mod registry;
pub mod scheduler;
pub mod upcoming;

pub use executor::{Executor, FireOutcome};
pub use registry::{JobHandle, JobRegistry};
pub use scheduler::Scheduler;
pub use upcoming::{UpcomingFire, UpcomingQuery};
