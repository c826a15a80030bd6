//! Runtime bookkeeping for live timer jobs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use gatehouse_core::GateAction;
use tokio::task::JoinHandle;
use tracing::debug;

/// A live timer job for one schedule. Never persisted; a restart rebuilds
/// every handle from the store.
pub struct JobHandle {
    task: JoinHandle<()>,
    /// Action captured at registration time. A staleness fingerprint for
    /// the Executor, never the decision input.
    pub action: GateAction,
    /// Recurrence the timer was registered with.
    pub recurrence: String,
    pub registered_at: DateTime<Utc>,
}

impl JobHandle {
    pub fn new(task: JoinHandle<()>, action: GateAction, recurrence: String) -> Self {
        Self {
            task,
            action,
            recurrence,
            registered_at: Utc::now(),
        }
    }

    fn abort(&self) {
        self.task.abort();
    }
}

/// Maps schedule identity to its live [`JobHandle`].
///
/// An explicit object owned by and injected into the [`Scheduler`]
/// (never a module-level singleton), so independent scheduler instances
/// coexist in tests. An unregistered schedule has zero handles here.
///
/// [`Scheduler`]: crate::Scheduler
#[derive(Default)]
pub struct JobRegistry {
    handles: HashMap<String, JobHandle>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle. Any existing handle for the same identity is
    /// aborted and replaced, so double registration cannot occur.
    pub fn insert(&mut self, name: String, handle: JobHandle) {
        if let Some(old) = self.handles.insert(name.clone(), handle) {
            debug!(name = %name, "replacing live job handle");
            old.abort();
        }
    }

    /// Abort and drop the handle for `name`. A no-op if unregistered.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.handles.remove(name) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&JobHandle> {
        self.handles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Abort every handle (process shutdown).
    pub fn clear(&mut self) {
        for handle in self.handles.values() {
            handle.abort();
        }
        self.handles.clear();
    }
}
