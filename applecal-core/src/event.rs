//! Event types and the input validation applied before any request.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};

use crate::error::{AppleCalError, CalResult};
use crate::time::{
    format_iso, midnight_utc, normalize_all_day_range, parse_instant, validate_time_range,
};

/// Longest uid accepted for addressing an event resource.
pub const MAX_UID_LEN: usize = 255;

/// An event as read from the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub uid: String,
    pub summary: Option<String>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    pub all_day: bool,
    pub location: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    /// Concurrency token, present only after a successful fetch.
    pub etag: Option<String>,
    /// Resource address the body was fetched from.
    pub href: Option<String>,
}

impl Event {
    pub fn is_cancelled(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case("CANCELLED"))
    }

    /// Start as a UTC instant (dates map to midnight UTC).
    pub fn start_utc(&self) -> Option<DateTime<Utc>> {
        self.start.as_ref().map(EventTime::to_utc)
    }

    pub fn end_utc(&self) -> Option<DateTime<Utc>> {
        self.end.as_ref().map(EventTime::to_utc)
    }

    /// Case-insensitive substring match against summary, location and
    /// description.
    pub fn matches_text(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        [&self.summary, &self.location, &self.description]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl EventTime {
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::DateTime(dt) => *dt,
            EventTime::Date(d) => midnight_utc(*d),
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            EventTime::DateTime(dt) => dt.date_naive(),
            EventTime::Date(d) => *d,
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }
}

/// Date-times render as ISO 8601 UTC, dates as `YYYY-MM-DD`.
impl Serialize for EventTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EventTime::DateTime(dt) => serializer.serialize_str(&format_iso(dt)),
            EventTime::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Fields for a new event, as given by the caller.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub summary: String,
    pub start: String,
    pub end: String,
    pub all_day: bool,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl NewEvent {
    /// Validate the summary and range, returning the normalised span.
    pub fn validate(&self) -> CalResult<(EventTime, EventTime)> {
        require_non_empty("summary", &self.summary)?;
        resolve_span(&self.start, &self.end, self.all_day)
    }
}

/// A partial update. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub summary: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub all_day: Option<bool>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.all_day.is_none()
            && self.location.is_none()
            && self.description.is_none()
    }
}

/// What an update stores: merged fields, or a verbatim replacement body.
#[derive(Debug, Clone)]
pub enum EventUpdate {
    Fields(EventPatch),
    Raw(String),
}

impl EventUpdate {
    pub fn validate(&self) -> CalResult<()> {
        match self {
            EventUpdate::Fields(patch) => {
                if patch.is_empty() {
                    return Err(AppleCalError::validation(
                        "nothing to update: provide at least one field",
                    ));
                }
                if let Some(summary) = &patch.summary {
                    require_non_empty("summary", summary)?;
                }
                if let (Some(start), Some(end)) = (&patch.start, &patch.end) {
                    match patch.all_day {
                        Some(all_day) => validate_time_range(start, end, all_day)?,
                        // The stored all-day flag is unknown until the event is fetched.
                        None => {
                            if parse_instant(end)? < parse_instant(start)? {
                                return Err(AppleCalError::validation(
                                    "end must not be earlier than start",
                                ));
                            }
                        }
                    }
                }
                Ok(())
            }
            EventUpdate::Raw(body) => require_non_empty("raw body", body),
        }
    }
}

/// Validate and normalise a user-supplied start/end pair.
///
/// All-day spans become dates with an exclusive end at least one day after
/// the start; timed spans become UTC instants.
pub fn resolve_span(start: &str, end: &str, all_day: bool) -> CalResult<(EventTime, EventTime)> {
    validate_time_range(start, end, all_day)?;
    if all_day {
        let (start, end) = normalize_all_day_range(start, end)?;
        Ok((EventTime::Date(start), EventTime::Date(end)))
    } else {
        Ok((
            EventTime::DateTime(parse_instant(start)?),
            EventTime::DateTime(parse_instant(end)?),
        ))
    }
}

/// A uid must be 1-255 characters from `[A-Za-z0-9._@:+-]`, so it is safe
/// to embed in a resource name.
pub fn validate_uid(uid: &str) -> CalResult<()> {
    let valid_chars = uid
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '@' | ':' | '+' | '-'));
    if uid.is_empty() || uid.len() > MAX_UID_LEN || !valid_chars {
        return Err(AppleCalError::validation(format!(
            "invalid uid {uid:?}: use 1-{MAX_UID_LEN} characters from [A-Za-z0-9._@:+-]"
        )));
    }
    Ok(())
}

pub fn require_non_empty(field: &str, value: &str) -> CalResult<()> {
    if value.trim().is_empty() {
        return Err(AppleCalError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

pub fn validate_apple_id(apple_id: &str) -> CalResult<()> {
    if !apple_id.contains('@') {
        return Err(AppleCalError::validation(format!(
            "apple id must be an email address, got {apple_id:?}"
        )));
    }
    Ok(())
}
