//! Store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Bad input (unparsable recurrence, missing field). Rejected before
    /// any persistence change.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown schedule identity on update/delete.
    #[error("schedule not found: {0}")]
    NotFound(String),

    /// Duplicate schedule identity on create.
    #[error("schedule already exists: {0}")]
    Conflict(String),

    /// Transient backend I/O failure; safe to retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether a retry with backoff is worthwhile.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<gatehouse_recurrence::RecurrenceError> for StoreError {
    fn from(e: gatehouse_recurrence::RecurrenceError) -> Self {
        StoreError::Validation(e.to_string())
    }
}
