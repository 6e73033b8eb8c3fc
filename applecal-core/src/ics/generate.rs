//! Event and free/busy request body generation.

use chrono::{DateTime, Utc};

use super::escape::escape_text;
use super::fold::build_ics_text;
use crate::constants::PRODID;
use crate::date_range::TimeWindow;
use crate::event::EventTime;
use crate::time::{format_caldav_date, to_caldav_datetime};

/// The fields written into an event body.
#[derive(Debug, Clone)]
pub struct EventBody<'a> {
    pub uid: &'a str,
    pub dtstamp: DateTime<Utc>,
    pub start: EventTime,
    pub end: EventTime,
    pub summary: &'a str,
    pub location: Option<&'a str>,
    pub description: Option<&'a str>,
    pub status: Option<&'a str>,
    /// Unfolded `ATTACH` lines carried over verbatim.
    pub attachments: &'a [String],
}

/// Generate a single-event calendar body, folded and CRLF-terminated.
pub fn generate_event(body: &EventBody<'_>) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}", body.uid),
        format!("DTSTAMP:{}", to_caldav_datetime(&body.dtstamp)),
        time_property("DTSTART", &body.start),
        time_property("DTEND", &body.end),
        format!("SUMMARY:{}", escape_text(body.summary)),
    ];

    if let Some(location) = body.location {
        lines.push(format!("LOCATION:{}", escape_text(location)));
    }
    if let Some(description) = body.description {
        lines.push(format!("DESCRIPTION:{}", escape_text(description)));
    }
    if let Some(status) = body.status {
        lines.push(format!("STATUS:{}", status.trim().to_ascii_uppercase()));
    }
    lines.extend(body.attachments.iter().cloned());

    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());
    build_ics_text(&lines)
}

/// Generate the VFREEBUSY scheduling request posted to the outbox, with
/// `address` (a `mailto:` URI) as both organizer and attendee.
pub fn generate_freebusy_request(
    uid: &str,
    dtstamp: DateTime<Utc>,
    window: &TimeWindow,
    address: &str,
) -> String {
    let (start, end) = window.caldav_bounds();
    let lines = [
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
        "METHOD:REQUEST".to_string(),
        "BEGIN:VFREEBUSY".to_string(),
        format!("UID:{uid}"),
        format!("DTSTAMP:{}", to_caldav_datetime(&dtstamp)),
        format!("DTSTART:{start}"),
        format!("DTEND:{end}"),
        format!("ORGANIZER:{address}"),
        format!("ATTENDEE:{address}"),
        "END:VFREEBUSY".to_string(),
        "END:VCALENDAR".to_string(),
    ];
    build_ics_text(&lines)
}

fn time_property(name: &str, time: &EventTime) -> String {
    match time {
        EventTime::DateTime(dt) => format!("{name}:{}", to_caldav_datetime(dt)),
        EventTime::Date(d) => format!("{name};VALUE=DATE:{}", format_caldav_date(d)),
    }
}
