//! Conversions between ISO 8601 input, the compact CalDAV wire forms and
//! all-day dates.
//!
//! Everything timed is normalised to UTC. Values without a zone designator
//! are taken as UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::constants::{CALDAV_DATE_FORMAT, CALDAV_DATETIME_FORMAT};
use crate::error::{AppleCalError, CalResult};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO 8601 instant (with `Z`, an offset, or no zone) or a bare
/// `YYYYMMDD` / `YYYY-MM-DD` date into a UTC instant.
pub fn parse_instant(value: &str) -> CalResult<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppleCalError::Format("empty date/time".into()));
    }

    if is_compact_date(value) {
        return parse_caldav_date(value).map(midnight_utc);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let with_offset = match value.strip_suffix(['Z', 'z']) {
        Some(head) => format!("{head}+00:00"),
        None => value.to_string(),
    };
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&with_offset, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(midnight_utc(date));
    }

    Err(AppleCalError::Format(format!(
        "{value} (use ISO 8601, e.g. 2026-03-05T09:00:00Z)"
    )))
}

/// Format a UTC instant in the compact wire form `YYYYMMDDTHHMMSSZ`.
pub fn to_caldav_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(CALDAV_DATETIME_FORMAT).to_string()
}

/// ISO 8601 input to the compact wire form.
pub fn iso_to_caldav(value: &str) -> CalResult<String> {
    parse_instant(value).map(|dt| to_caldav_datetime(&dt))
}

/// Parse a compact wire timestamp (`YYYYMMDDTHHMMSS[Z]`). Anything other
/// than digits and `T` is ignored, so zone markers and stray separators
/// do not matter.
pub fn parse_caldav_datetime(raw: &str) -> CalResult<DateTime<Utc>> {
    let clean: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'T')
        .collect();
    NaiveDateTime::parse_from_str(&clean, "%Y%m%dT%H%M%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| AppleCalError::Format(raw.to_string()))
}

/// Compact wire timestamp to an ISO 8601 UTC string.
pub fn caldav_to_iso(raw: &str) -> CalResult<String> {
    parse_caldav_datetime(raw).map(|dt| format_iso(&dt))
}

/// ISO 8601 rendering used for every instant this crate returns.
pub fn format_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn serialize_iso<S: serde::Serializer>(
    dt: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_iso(dt))
}

/// Parse a compact date (`YYYYMMDD`).
pub fn parse_caldav_date(raw: &str) -> CalResult<NaiveDate> {
    let clean: String = raw.chars().filter(char::is_ascii_digit).collect();
    NaiveDate::parse_from_str(&clean, CALDAV_DATE_FORMAT)
        .map_err(|_| AppleCalError::Format(raw.to_string()))
}

pub fn format_caldav_date(date: &NaiveDate) -> String {
    date.format(CALDAV_DATE_FORMAT).to_string()
}

/// Read a user-supplied all-day boundary: `YYYYMMDD`, `YYYY-MM-DD`, or any
/// instant accepted by [`parse_instant`] (its UTC date is used).
pub fn to_caldav_date(value: &str) -> CalResult<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppleCalError::validation(
            "date value is required for all-day events",
        ));
    }
    if is_compact_date(value) {
        return parse_caldav_date(value);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_instant(value).map(|dt| dt.date_naive())
}

/// Normalise an all-day pair so the (exclusive) end is after the start.
/// A same-day or inverted end becomes start + 1 day.
pub fn normalize_all_day_range(start: &str, end: &str) -> CalResult<(NaiveDate, NaiveDate)> {
    let start = to_caldav_date(start)?;
    let end = to_caldav_date(end)?;
    Ok(normalize_dates(start, end))
}

pub(crate) fn normalize_dates(start: NaiveDate, end: NaiveDate) -> (NaiveDate, NaiveDate) {
    if end <= start {
        (start, start + Duration::days(1))
    } else {
        (start, end)
    }
}

/// Reject inverted ranges before any request is made.
///
/// Timed ranges need `end > start`; all-day ranges accept `end == start`
/// (normalised later to a one-day span) but reject `end < start`.
pub fn validate_time_range(start: &str, end: &str, all_day: bool) -> CalResult<()> {
    if all_day {
        let start = to_caldav_date(start)?;
        let end = to_caldav_date(end)?;
        if end < start {
            return Err(AppleCalError::validation(
                "end must be the same day or later for all-day events",
            ));
        }
    } else {
        let start = parse_instant(start)?;
        let end = parse_instant(end)?;
        if end <= start {
            return Err(AppleCalError::validation("end must be later than start"));
        }
    }
    Ok(())
}

pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn is_compact_date(value: &str) -> bool {
    value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit())
}
