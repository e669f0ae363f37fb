//! Injected time source.
//!
//! The engine never calls the wall clock directly; every operation takes
//! "now" from a [`Clock`] so tests can pin time. Captured instants are
//! truncated to millisecond precision, matching both the persisted
//! timestamp format and the ordering index score unit.

use chrono::{DateTime, TimeZone, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Truncate to whole milliseconds.
#[must_use]
pub(crate) fn to_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(instant.timestamp_millis())
        .single()
        .unwrap_or(instant)
}
