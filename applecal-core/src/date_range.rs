//! Query window for listing and free/busy lookups.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::constants::DEFAULT_LIST_DAYS;
use crate::error::{AppleCalError, CalResult};
use crate::time::{parse_instant, to_caldav_datetime};

/// A half-open UTC window `[start, end)` with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// A non-empty UTC interval produced by clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    #[serde(serialize_with = "crate::time::serialize_iso")]
    pub start: DateTime<Utc>,
    #[serde(serialize_with = "crate::time::serialize_iso")]
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CalResult<Self> {
        if end <= start {
            return Err(AppleCalError::validation("end must be later than start"));
        }
        Ok(TimeWindow { start, end })
    }

    /// Parse both ends from ISO 8601 strings.
    pub fn parse(start: &str, end: &str) -> CalResult<Self> {
        Self::new(parse_instant(start)?, parse_instant(end)?)
    }

    /// Window from the given optional ends, defaulting to now .. now + 7 days.
    pub fn from_args(start: Option<&str>, end: Option<&str>) -> CalResult<Self> {
        let now = Utc::now();
        let start = match start {
            Some(s) => parse_instant(s)?,
            None => now,
        };
        let end = match end {
            Some(s) => parse_instant(s)?,
            None => now + Duration::days(DEFAULT_LIST_DAYS),
        };
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Window bounds in the compact wire form, for time-range filters.
    pub fn caldav_bounds(&self) -> (String, String) {
        (to_caldav_datetime(&self.start), to_caldav_datetime(&self.end))
    }

    /// Intersect `[start, end)` with this window.
    ///
    /// Returns `None` when the intersection is empty; that is "no overlap",
    /// not an error.
    pub fn clip(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Interval> {
        let clipped_start = start.max(self.start);
        let clipped_end = end.min(self.end);
        (clipped_start < clipped_end).then_some(Interval {
            start: clipped_start,
            end: clipped_end,
        })
    }
}
