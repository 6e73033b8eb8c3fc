//! Multi-calendar fan-out for event listing and free/busy.
//!
//! Calendars are processed one after another. A failure for one calendar is
//! recorded inline and never aborts the batch.

use serde::Serialize;
use tracing::warn;

use crate::caldav::DavTransport;
use crate::calendar::Calendar;
use crate::date_range::TimeWindow;
use crate::directory::{find_calendar, list_calendars};
use crate::error::{AppleCalError, CalResult, ErrorInfo};
use crate::event::{Event, require_non_empty};
use crate::freebusy::{BusyInterval, FreeBusyMethod, FreeBusyResolver, FreeBusyResult};
use crate::repository::EventRepository;
use crate::session::Session;

/// An event tagged with the calendar it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub calendar: String,
    #[serde(flatten)]
    pub event: Event,
}

/// A calendar that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarFailure {
    pub calendar: String,
    pub error: ErrorInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventListing {
    /// Merged events sorted by (start, uid), capped when a maximum is given.
    pub events: Vec<CalendarEvent>,
    pub errors: Vec<CalendarFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarFreeBusy {
    pub calendar: String,
    #[serde(flatten)]
    pub result: FreeBusyResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreeBusyOverview {
    /// Busy intervals from every calendar, sorted by (start, end, calendar).
    pub busy: Vec<BusyInterval>,
    pub calendars: Vec<CalendarFreeBusy>,
    pub method: &'static str,
}

pub struct Aggregator<'a, T: DavTransport + ?Sized> {
    transport: &'a T,
    session: &'a Session,
}

impl<'a, T: DavTransport + ?Sized> Aggregator<'a, T> {
    pub fn new(transport: &'a T, session: &'a Session) -> Self {
        Aggregator { transport, session }
    }

    /// List events across `names`, merged and sorted by (start, uid).
    ///
    /// `max_items` is applied after the merge; a negative value is rejected
    /// before any request is made.
    pub fn list_events(
        &self,
        names: &[String],
        window: &TimeWindow,
        query: Option<&str>,
        max_items: Option<i64>,
    ) -> CalResult<EventListing> {
        validate_names(names)?;
        let cap = validate_max(max_items)?;

        let directory = list_calendars(self.transport, self.session);
        let repository = EventRepository::new(self.transport);
        let mut events = Vec::new();
        let mut errors = Vec::new();

        for name in names {
            let listed = lookup(&directory, name).and_then(|calendar| {
                repository
                    .list(calendar, window, query)
                    .map_err(|err| ErrorInfo::from(&err))
            });
            match listed {
                Ok(found) => events.extend(found.into_iter().map(|event| CalendarEvent {
                    calendar: name.clone(),
                    event,
                })),
                Err(error) => {
                    warn!(calendar = %name, error = %error.message, "listing failed for calendar");
                    errors.push(CalendarFailure {
                        calendar: name.clone(),
                        error,
                    });
                }
            }
        }

        events.sort_by(|a, b| {
            (a.event.start_utc(), &a.event.uid).cmp(&(b.event.start_utc(), &b.event.uid))
        });
        if let Some(cap) = cap {
            events.truncate(cap);
        }

        Ok(EventListing { events, errors })
    }

    /// Resolve free/busy for every calendar in `names` and merge the busy
    /// intervals.
    pub fn free_busy(&self, names: &[String], window: &TimeWindow) -> CalResult<FreeBusyOverview> {
        validate_names(names)?;

        let directory = list_calendars(self.transport, self.session);
        let resolver = FreeBusyResolver::new(self.transport, self.session);
        let mut busy = Vec::new();
        let mut calendars = Vec::new();

        for name in names {
            let result = match lookup(&directory, name) {
                Ok(calendar) => resolver.resolve(calendar, window),
                Err(error) => {
                    warn!(
                        calendar = %name,
                        error = %error.message,
                        "free/busy skipped for calendar"
                    );
                    FreeBusyResult {
                        method: FreeBusyMethod::Failed,
                        busy: Vec::new(),
                        attempts: Vec::new(),
                        fallback_reason: None,
                        error: Some(error),
                    }
                }
            };

            busy.extend(result.busy.iter().cloned().map(|interval| BusyInterval {
                calendar: Some(name.clone()),
                ..interval
            }));
            calendars.push(CalendarFreeBusy {
                calendar: name.clone(),
                result,
            });
        }

        busy.sort_by(|a, b| (a.start, a.end, &a.calendar).cmp(&(b.start, b.end, &b.calendar)));

        Ok(FreeBusyOverview {
            busy,
            calendars,
            method: "multi_calendar_aggregate",
        })
    }
}

/// Convert an optional item cap, rejecting negative values.
pub fn validate_max(max_items: Option<i64>) -> CalResult<Option<usize>> {
    match max_items {
        Some(max) if max < 0 => Err(AppleCalError::validation("max must be >= 0")),
        Some(max) => Ok(Some(usize::try_from(max).unwrap_or(usize::MAX))),
        None => Ok(None),
    }
}

/// At least one calendar, none of them blank.
pub fn validate_names(names: &[String]) -> CalResult<()> {
    if names.is_empty() {
        return Err(AppleCalError::validation(
            "at least one calendar must be provided",
        ));
    }
    names
        .iter()
        .try_for_each(|name| require_non_empty("calendar", name))
}

/// Resolve `name` against a directory listing that may itself have failed.
fn lookup<'c>(
    directory: &'c CalResult<Vec<Calendar>>,
    name: &str,
) -> Result<&'c Calendar, ErrorInfo> {
    match directory {
        Ok(calendars) => find_calendar(calendars, name).map_err(|err| ErrorInfo::from(&err)),
        Err(err) => Err(ErrorInfo::from(err)),
    }
}
