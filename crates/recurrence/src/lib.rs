//! Pure recurrence computation: cron validation and next-fire-time lookup.
//!
//! This is the only place in the workspace that does calendar arithmetic.
//! Everything here is deterministic, side-effect free, and never blocks.
//! Callers pass a reference instant and a timezone; daylight-saving
//! ambiguity resolves to the earliest valid instant in the zone's local
//! calendar, and local times that fall into a DST gap are skipped.

use std::str::FromStr;

use chrono::{DateTime, LocalResult, TimeZone, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use thiserror::Error;

/// Upper bound on wall-clock candidates examined per lookup. Only DST-gap
/// skips and the strictly-after boundary ever consume more than one.
const MAX_CANDIDATES: usize = 1_000;

#[derive(Debug, Error)]
pub enum RecurrenceError {
    #[error("invalid recurrence expression '{expr}': {detail}")]
    Parse { expr: String, detail: String },
}

/// Normalize a 5-field cron expression to the 6-field form the `cron`
/// crate requires, by prepending "0" for seconds.
///
/// User-facing expressions use standard 5-field cron:
/// `minute hour day-of-month month day-of-week`. A 6-field expression
/// passes through unchanged.
pub fn normalize(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Parse a timezone string into a [`Tz`], falling back to UTC.
pub fn parse_tz(tz: &str) -> Tz {
    tz.parse::<Tz>().unwrap_or(chrono_tz::UTC)
}

fn parse(expr: &str) -> Result<Schedule, RecurrenceError> {
    Schedule::from_str(&normalize(expr)).map_err(|e| RecurrenceError::Parse {
        expr: expr.to_string(),
        detail: e.to_string(),
    })
}

/// Syntactic check only. No side effects.
pub fn validate(expr: &str) -> Result<(), RecurrenceError> {
    parse(expr).map(|_| ())
}

/// Earliest instant strictly later than `after` that satisfies `expr`
/// interpreted in `tz`, as UTC.
///
/// Returns `Ok(None)` if the expression has no future occurrence.
pub fn next_fire_time(
    expr: &str,
    tz: Tz,
    after: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, RecurrenceError> {
    let schedule = parse(expr)?;

    // Iterate the schedule over the zone's wall clock: lift the local
    // wall-clock time into Utc so the cron iterator matches calendar
    // fields only, then resolve each matching wall-clock time back to a
    // real instant.
    let wall = Utc.from_utc_datetime(&after.with_timezone(&tz).naive_local());
    for candidate in schedule.after(&wall).take(MAX_CANDIDATES) {
        let resolved = match tz.from_local_datetime(&candidate.naive_utc()) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            // Fall-back overlap: the earliest mapping is chosen.
            LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            // Spring-forward gap: this wall-clock time does not exist.
            LocalResult::None => continue,
        };
        if resolved > after {
            return Ok(Some(resolved));
        }
    }
    Ok(None)
}

/// Up to `n` occurrences strictly after `after`, ascending.
pub fn next_fire_times(
    expr: &str,
    tz: Tz,
    after: DateTime<Utc>,
    n: usize,
) -> Result<Vec<DateTime<Utc>>, RecurrenceError> {
    let mut results = Vec::with_capacity(n);
    let mut cursor = after;
    for _ in 0..n {
        match next_fire_time(expr, tz, cursor)? {
            Some(next) => {
                results.push(next);
                cursor = next;
            }
            None => break,
        }
    }
    Ok(results)
}
