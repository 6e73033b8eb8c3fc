//! Event repository: list, get, create, update and delete event resources
//! within one calendar collection.

use chrono::Utc;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::caldav::{DavRequest, DavResponse, DavTransport, absolute_url, body, xml};
use crate::calendar::Calendar;
use crate::date_range::TimeWindow;
use crate::error::{AppleCalError, CalResult};
use crate::event::{
    Event, EventPatch, EventTime, EventUpdate, NewEvent, validate_uid,
};
use crate::ics::{EventBody, attachment_lines, generate_event, parse_event};
use crate::time::{normalize_dates, parse_instant, to_caldav_date};

/// A raw event resource as stored on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedEvent {
    pub url: String,
    pub body: String,
    pub etag: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStatus {
    Created,
    Updated,
    Deleted,
}

/// Outcome of a create, update or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteResult {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub status: WriteStatus,
}

pub struct EventRepository<'a, T: DavTransport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: DavTransport + ?Sized> EventRepository<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        EventRepository { transport }
    }

    /// Events overlapping `window`, optionally filtered by a case-insensitive
    /// substring of summary, location or description.
    ///
    /// The server only filters by time; text filtering happens here. The
    /// returned order is whatever the server sent.
    pub fn list(
        &self,
        calendar: &Calendar,
        window: &TimeWindow,
        query: Option<&str>,
    ) -> CalResult<Vec<Event>> {
        let (start, end) = window.caldav_bounds();
        let request = DavRequest::report(&calendar.url, 1, body::events_in_range(&start, &end));
        let response = self.transport.send(&request)?;
        ensure_success("REPORT", &calendar.url, &response)?;

        let query = query.map(str::trim).filter(|q| !q.is_empty());
        let mut events = Vec::new();
        for resource in xml::calendar_resources(&response.body)? {
            let Some(mut event) = parse_event(&resource.data) else {
                debug!(href = %resource.href, "skipping resource without a parseable VEVENT");
                continue;
            };
            event.etag = resource.etag;
            event.href = Some(absolute_url(&resource.href, &calendar.url));
            if query.is_none_or(|q| event.matches_text(q)) {
                events.push(event);
            }
        }

        debug!(calendar = %calendar.name, count = events.len(), "listed events");
        Ok(events)
    }

    /// Fetch the raw resource for `uid`.
    ///
    /// Tries `{calendar}/{uid}.ics` first; on any non-success status falls
    /// back to a UID-filtered calendar-query and keeps the first resource
    /// whose UID is exactly `uid`. Returns `None` when neither finds it.
    pub fn get(&self, calendar: &Calendar, uid: &str) -> CalResult<Option<FetchedEvent>> {
        validate_uid(uid)?;

        let url = calendar.event_url(uid);
        let response = self.transport.send(&DavRequest::get(&url))?;
        if response.is_success() {
            return Ok(Some(FetchedEvent {
                url,
                body: response.body,
                etag: response.etag,
            }));
        }
        debug!(uid, status = response.status, "direct GET failed, searching by UID");

        let request = DavRequest::report(&calendar.url, 1, body::event_by_uid(uid));
        let response = self.transport.send(&request)?;
        ensure_success("REPORT", &calendar.url, &response)?;

        // text-match is a substring match, so the UID has to be checked here.
        Ok(xml::calendar_resources(&response.body)?
            .into_iter()
            .find(|resource| parse_event(&resource.data).is_some_and(|event| event.uid == uid))
            .map(|resource| FetchedEvent {
                url: absolute_url(&resource.href, &calendar.url),
                body: resource.data,
                etag: resource.etag,
            }))
    }

    /// Fetch and parse the event, with its etag and address.
    pub fn get_event(&self, calendar: &Calendar, uid: &str) -> CalResult<Option<Event>> {
        let Some(fetched) = self.get(calendar, uid)? else {
            return Ok(None);
        };
        let mut event = parse_event(&fetched.body).ok_or_else(|| {
            AppleCalError::MalformedResponse(format!(
                "resource {} has no VEVENT with a UID",
                fetched.url
            ))
        })?;
        event.etag = fetched.etag;
        event.href = Some(fetched.url);
        Ok(Some(event))
    }

    /// Like [`Self::get`], but a missing event is an error.
    pub fn fetch(&self, calendar: &Calendar, uid: &str) -> CalResult<FetchedEvent> {
        self.get(calendar, uid)?
            .ok_or_else(|| AppleCalError::not_found("Event", uid))
    }

    /// Store a new event under a freshly generated uid.
    ///
    /// No existence precondition is sent, so a uid collision overwrites.
    pub fn create(&self, calendar: &Calendar, new: &NewEvent) -> CalResult<WriteResult> {
        let (start, end) = new.validate()?;
        let uid = Uuid::new_v4().to_string().to_uppercase();

        let ics = generate_event(&EventBody {
            uid: &uid,
            dtstamp: Utc::now(),
            start,
            end,
            summary: &new.summary,
            location: non_empty(new.location.as_deref()),
            description: non_empty(new.description.as_deref()),
            status: None,
            attachments: &[],
        });

        let url = calendar.event_url(&uid);
        let response = self
            .transport
            .send(&DavRequest::put_calendar(&url, ics))?;
        ensure_success("PUT", &url, &response)?;

        debug!(uid = %uid, url = %url, "created event");
        Ok(WriteResult {
            uid,
            url: Some(url),
            status: WriteStatus::Created,
        })
    }

    /// Replace the event body, either with merged fields or verbatim.
    ///
    /// The PUT carries `If-Match` with the fetched etag when there is one; a
    /// mismatch is a conflict and is not retried.
    pub fn update(
        &self,
        calendar: &Calendar,
        uid: &str,
        update: &EventUpdate,
    ) -> CalResult<WriteResult> {
        validate_uid(uid)?;
        update.validate()?;

        let current = self.fetch(calendar, uid)?;
        let ics = match update {
            EventUpdate::Raw(raw) => raw.clone(),
            EventUpdate::Fields(patch) => merge_patch(&current, uid, patch)?,
        };

        self.replace(&current, uid, ics)
    }

    /// Store `ics` over an already fetched resource, conditioned on the etag
    /// it was fetched with.
    pub fn replace(
        &self,
        current: &FetchedEvent,
        uid: &str,
        ics: String,
    ) -> CalResult<WriteResult> {
        let request = DavRequest::put_calendar(&current.url, ics).if_match(current.etag.as_deref());
        let response = self.transport.send(&request)?;
        check_conditional("PUT", uid, current, &response)?;

        debug!(uid, url = %current.url, "updated event");
        Ok(WriteResult {
            uid: uid.to_string(),
            url: Some(current.url.clone()),
            status: WriteStatus::Updated,
        })
    }

    /// Delete the event, conditioned on its current etag.
    pub fn delete(&self, calendar: &Calendar, uid: &str) -> CalResult<WriteResult> {
        validate_uid(uid)?;

        let current = self.fetch(calendar, uid)?;
        let request = DavRequest::delete(&current.url).if_match(current.etag.as_deref());
        let response = self.transport.send(&request)?;
        check_conditional("DELETE", uid, &current, &response)?;

        debug!(uid, url = %current.url, "deleted event");
        Ok(WriteResult {
            uid: uid.to_string(),
            url: None,
            status: WriteStatus::Deleted,
        })
    }
}

fn ensure_success(method: &str, url: &str, response: &DavResponse) -> CalResult<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(AppleCalError::protocol(method, url, response.status, &response.body))
    }
}

/// Map the status of a conditional write.
fn check_conditional(
    method: &str,
    uid: &str,
    current: &FetchedEvent,
    response: &DavResponse,
) -> CalResult<()> {
    match response.status {
        _ if response.is_success() => Ok(()),
        412 => Err(AppleCalError::Conflict {
            url: current.url.clone(),
            etag: current.etag.clone().unwrap_or_default(),
        }),
        404 => Err(AppleCalError::not_found("Event", uid)),
        status => Err(AppleCalError::protocol(method, &current.url, status, &response.body)),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Build the new body for a field update.
///
/// Unset fields keep their current values, DTSTAMP is refreshed and every
/// ATTACH line of the current body is carried over unchanged. The all-day
/// flag is the patch value when given, otherwise the current one; current
/// start/end values are converted to match it (dates become midnight UTC,
/// instants become their UTC date).
fn merge_patch(current: &FetchedEvent, uid: &str, patch: &EventPatch) -> CalResult<String> {
    let event = parse_event(&current.body).ok_or_else(|| {
        AppleCalError::MalformedResponse(format!(
            "resource {} has no VEVENT with a UID",
            current.url
        ))
    })?;
    let all_day = patch.all_day.unwrap_or(event.all_day);

    let start = merged_time(patch.start.as_deref(), event.start, all_day)?;
    let end = merged_time(patch.end.as_deref(), event.end, all_day)?;
    let (Some(start), Some(end)) = (start, end) else {
        return Err(AppleCalError::validation(
            "event start/end could not be determined for update",
        ));
    };
    let (start, end) = check_span(start, end)?;

    let summary = patch
        .summary
        .clone()
        .or(event.summary)
        .unwrap_or_default();
    let location = patch.location.clone().or(event.location);
    let description = patch.description.clone().or(event.description);
    let attachments = attachment_lines(&current.body);

    Ok(generate_event(&EventBody {
        uid,
        dtstamp: Utc::now(),
        start,
        end,
        summary: &summary,
        location: non_empty(location.as_deref()),
        description: non_empty(description.as_deref()),
        status: event.status.as_deref(),
        attachments: &attachments,
    }))
}

fn merged_time(
    input: Option<&str>,
    current: Option<EventTime>,
    all_day: bool,
) -> CalResult<Option<EventTime>> {
    Ok(match (input, all_day) {
        (Some(value), true) => Some(EventTime::Date(to_caldav_date(value)?)),
        (Some(value), false) => Some(EventTime::DateTime(parse_instant(value)?)),
        (None, true) => current.map(|t| EventTime::Date(t.date())),
        (None, false) => current.map(|t| EventTime::DateTime(t.to_utc())),
    })
}

/// Enforce the range invariant on a merged span; a same-day all-day span
/// becomes one day long.
fn check_span(start: EventTime, end: EventTime) -> CalResult<(EventTime, EventTime)> {
    match (start, end) {
        (EventTime::Date(s), EventTime::Date(e)) => {
            if e < s {
                return Err(AppleCalError::validation(
                    "end must be the same day or later for all-day events",
                ));
            }
            let (s, e) = normalize_dates(s, e);
            Ok((EventTime::Date(s), EventTime::Date(e)))
        }
        (s, e) => {
            if e.to_utc() <= s.to_utc() {
                return Err(AppleCalError::validation("end must be later than start"));
            }
            Ok((s, e))
        }
    }
}
