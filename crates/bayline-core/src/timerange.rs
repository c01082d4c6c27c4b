//! Half-open time intervals for appointment scheduling.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BaylineError, BaylineResult};

/// A half-open interval `[start, end)` with `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> BaylineResult<Self> {
        if end <= start {
            return Err(BaylineError::validation(format!(
                "interval end ({end}) must be after start ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Build a range from a start and an optional end.
    ///
    /// A missing end, or an end equal to the start, is normalized to
    /// `start + default_duration` so that zero-duration bookings are
    /// never treated as instantaneous (which would make overlap checks
    /// vacuous). An end before the start is a validation error.
    pub fn normalize(
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        default_duration: Duration,
    ) -> BaylineResult<Self> {
        match end {
            Some(end) if end < start => Err(BaylineError::validation(format!(
                "interval end ({end}) must not be before start ({start})"
            ))),
            Some(end) if end > start => Ok(Self { start, end }),
            // None or end == start.
            _ => Ok(Self {
                start,
                end: start + default_duration,
            }),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Half-open overlap: `[a, b)` and `[c, d)` overlap iff `a < d && b > c`.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }
}
