//! Free/busy resolution with graceful degradation.
//!
//! Three tiers, tried in order until one gives a definitive answer:
//! 1. VFREEBUSY request POSTed to the scheduling outbox, once per mail
//!    address (a 403 moves on to the next address, anything else ends the tier)
//! 2. free-busy-query REPORT on the calendar collection
//! 3. busy time derived from the calendar's events
//!
//! Every outbox and report attempt is recorded in the result.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::caldav::{DavMethod, DavRequest, DavResponse, DavTransport, body, rehost, xml};
use crate::calendar::Calendar;
use crate::constants::CALENDAR_CONTENT_TYPE;
use crate::date_range::{Interval, TimeWindow};
use crate::error::{AppleCalError, ErrorInfo, excerpt};
use crate::ics::{component_properties, generate_freebusy_request};
use crate::repository::EventRepository;
use crate::session::Session;
use crate::time::parse_caldav_datetime;

const FALLBACK_REASON: &str =
    "CalDAV scheduling and report methods failed or returned no data";

/// The tier that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FreeBusyMethod {
    OutboxPost,
    CaldavReport,
    EventFallback,
    Failed,
}

/// One recorded outbox or report attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub method: FreeBusyMethod,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// First 200 characters of the response body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Attempt {
    fn response(method: FreeBusyMethod, url: &str, response: &DavResponse) -> Self {
        Attempt {
            method,
            url: url.to_string(),
            http_status: Some(response.status),
            result: Some(excerpt(&response.body)),
            error: None,
        }
    }

    fn failure(method: FreeBusyMethod, url: &str, error: &AppleCalError) -> Self {
        Attempt {
            method,
            url: url.to_string(),
            http_status: None,
            result: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusyInterval {
    #[serde(serialize_with = "crate::time::serialize_iso")]
    pub start: DateTime<Utc>,
    #[serde(serialize_with = "crate::time::serialize_iso")]
    pub end: DateTime<Utc>,
    pub summary: Option<String>,
    /// Owning calendar, set only in multi-calendar results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar: Option<String>,
}

impl BusyInterval {
    fn from_interval(interval: Interval, summary: Option<String>) -> Self {
        BusyInterval {
            start: interval.start,
            end: interval.end,
            summary,
            calendar: None,
        }
    }
}

/// Busy intervals for one calendar plus the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreeBusyResult {
    pub method: FreeBusyMethod,
    pub busy: Vec<BusyInterval>,
    pub attempts: Vec<Attempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl FreeBusyResult {
    fn found(method: FreeBusyMethod, busy: Vec<BusyInterval>, attempts: Vec<Attempt>) -> Self {
        FreeBusyResult {
            method,
            busy,
            attempts,
            fallback_reason: None,
            error: None,
        }
    }
}

pub struct FreeBusyResolver<'a, T: DavTransport + ?Sized> {
    transport: &'a T,
    session: &'a Session,
}

impl<'a, T: DavTransport + ?Sized> FreeBusyResolver<'a, T> {
    pub fn new(transport: &'a T, session: &'a Session) -> Self {
        FreeBusyResolver { transport, session }
    }

    /// Resolve busy time for `calendar` within `window`.
    ///
    /// Never fails: when even the event-derived tier cannot list events the
    /// result has method `failed` and carries the error.
    pub fn resolve(&self, calendar: &Calendar, window: &TimeWindow) -> FreeBusyResult {
        let mut attempts = Vec::new();

        if let Some(busy) = self.try_outbox(window, &mut attempts) {
            return FreeBusyResult::found(FreeBusyMethod::OutboxPost, busy, attempts);
        }
        if let Some(busy) = self.try_report(calendar, window, &mut attempts) {
            return FreeBusyResult::found(FreeBusyMethod::CaldavReport, busy, attempts);
        }

        let events = EventRepository::new(self.transport).list(calendar, window, None);
        match events {
            Ok(events) => {
                let busy = events
                    .into_iter()
                    .filter(|event| !event.is_cancelled())
                    .filter_map(|event| {
                        let interval = window.clip(event.start_utc()?, event.end_utc()?)?;
                        Some(BusyInterval::from_interval(interval, event.summary))
                    })
                    .collect::<Vec<_>>();
                info!(
                    calendar = %calendar.name,
                    busy = busy.len(),
                    "free/busy derived from events"
                );
                FreeBusyResult {
                    method: FreeBusyMethod::EventFallback,
                    busy,
                    attempts,
                    fallback_reason: Some(FALLBACK_REASON.to_string()),
                    error: None,
                }
            }
            Err(err) => {
                info!(calendar = %calendar.name, error = %err, "free/busy resolution failed");
                FreeBusyResult {
                    method: FreeBusyMethod::Failed,
                    busy: Vec::new(),
                    attempts,
                    fallback_reason: None,
                    error: Some(ErrorInfo::from(&err)),
                }
            }
        }
    }

    fn try_outbox(
        &self,
        window: &TimeWindow,
        attempts: &mut Vec<Attempt>,
    ) -> Option<Vec<BusyInterval>> {
        let outbox = self.session.outbox_url.as_deref()?;

        for address in &self.session.mail_addresses {
            let uid = Uuid::new_v4().to_string().to_uppercase();
            let ics = generate_freebusy_request(&uid, Utc::now(), window, address);
            let request = DavRequest::new(DavMethod::Post, outbox)
                .header("Content-Type", CALENDAR_CONTENT_TYPE)
                .header("Originator", address.as_str())
                .header("Recipient", address.as_str())
                .body(ics.into_bytes());

            match self.transport.send(&request) {
                Ok(response) => {
                    info!(
                        method = "outbox_post",
                        url = outbox,
                        status = response.status,
                        address = %address,
                        "free/busy attempt"
                    );
                    attempts.push(Attempt::response(FreeBusyMethod::OutboxPost, outbox, &response));
                    if matches!(response.status, 200 | 201) {
                        if let Some(busy) = busy_from_response(&response.body, window) {
                            return Some(busy);
                        }
                    }
                    if response.status != 403 {
                        break;
                    }
                }
                Err(err) => {
                    info!(method = "outbox_post", url = outbox, error = %err, "free/busy attempt");
                    attempts.push(Attempt::failure(FreeBusyMethod::OutboxPost, outbox, &err));
                    break;
                }
            }
        }

        None
    }

    fn try_report(
        &self,
        calendar: &Calendar,
        window: &TimeWindow,
        attempts: &mut Vec<Attempt>,
    ) -> Option<Vec<BusyInterval>> {
        // Route through the calendar-home server when the collection lives elsewhere.
        let url = rehost(&calendar.url, &self.session.home_url);
        let (start, end) = window.caldav_bounds();
        let request = DavRequest::report(&url, 1, body::free_busy_query(&start, &end));

        match self.transport.send(&request) {
            Ok(response) => {
                info!(
                    method = "caldav_report",
                    url = %url,
                    status = response.status,
                    "free/busy attempt"
                );
                attempts.push(Attempt::response(FreeBusyMethod::CaldavReport, &url, &response));
                if response.status == 200 {
                    return busy_from_response(&response.body, window);
                }
                None
            }
            Err(err) => {
                info!(method = "caldav_report", url = %url, error = %err, "free/busy attempt");
                attempts.push(Attempt::failure(FreeBusyMethod::CaldavReport, &url, &err));
                None
            }
        }
    }
}

/// Busy intervals from a response that carries a busy-time field.
///
/// Returns `None` when the body has no FREEBUSY data at all. Bodies wrapped
/// in XML are searched through their calendar-data elements.
pub fn busy_from_response(body: &str, window: &TimeWindow) -> Option<Vec<BusyInterval>> {
    if !body.contains("FREEBUSY") {
        return None;
    }

    let mut texts = Vec::new();
    if body.trim_start().starts_with('<') {
        texts = xml::calendar_data_texts(body).unwrap_or_default();
    }
    if texts.is_empty() {
        texts.push(body.to_string());
    }

    Some(
        texts
            .iter()
            .flat_map(|text| parse_freebusy(text, window))
            .map(|interval| BusyInterval::from_interval(interval, None))
            .collect(),
    )
}

/// Parse every FREEBUSY property into intervals clipped to `window`.
///
/// Periods may be `start/end` or `start/duration`. Properties with
/// `FBTYPE=FREE` are skipped, as are periods that do not parse.
pub fn parse_freebusy(text: &str, window: &TimeWindow) -> Vec<Interval> {
    let mut intervals = Vec::new();

    for prop in component_properties(text, "VFREEBUSY") {
        if !prop.is("FREEBUSY") {
            continue;
        }
        if prop.param("FBTYPE").is_some_and(|t| t.eq_ignore_ascii_case("FREE")) {
            continue;
        }

        for period in prop.value.split(',') {
            match parse_period(period.trim()) {
                Some((start, end)) => intervals.extend(window.clip(start, end)),
                None => debug!(period, "skipping unparseable FREEBUSY period"),
            }
        }
    }

    intervals
}

fn parse_period(period: &str) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let (start, end) = period.split_once('/')?;
    let start = parse_caldav_datetime(start).ok()?;
    let end = if end.starts_with(['P', '+']) {
        let duration = iso8601::duration(end.trim_start_matches('+')).ok()?;
        let std_duration: std::time::Duration = duration.into();
        start + chrono::Duration::from_std(std_duration).ok()?
    } else {
        parse_caldav_datetime(end).ok()?
    };
    Some((start, end))
}
