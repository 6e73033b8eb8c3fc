mod common;

use applecal_core::caldav::DavMethod;
use applecal_core::date_range::TimeWindow;
use applecal_core::freebusy::FreeBusyMethod;
use chrono::{DateTime, TimeZone, Utc};
use common::*;

fn window() -> TimeWindow {
    TimeWindow::parse("2026-03-05T00:00:00Z", "2026-03-06T00:00:00Z").unwrap()
}

fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, h, m, 0).unwrap()
}

const SCHEDULE_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<C:schedule-response xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <C:response>
    <C:recipient><D:href>mailto:me@icloud.com</D:href></C:recipient>
    <C:request-status>2.0;Success</C:request-status>
    <C:calendar-data>BEGIN:VCALENDAR
METHOD:REPLY
BEGIN:VFREEBUSY
FREEBUSY;FBTYPE=BUSY:20260305T090000Z/20260305T100000Z,20260305T140000Z/PT30M
FREEBUSY;FBTYPE=FREE:20260305T110000Z/20260305T120000Z
END:VFREEBUSY
END:VCALENDAR</C:calendar-data>
  </C:response>
</C:schedule-response>"#;

#[test]
fn test_outbox_post_answers_first() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    transport.on(DavMethod::Post, OUTBOX, with_body(200, OUTBOX, SCHEDULE_RESPONSE));

    let result = client.free_busy("Work", &window()).unwrap();

    assert_eq!(result.method, FreeBusyMethod::OutboxPost);
    let spans: Vec<_> = result.busy.iter().map(|b| (b.start, b.end)).collect();
    assert_eq!(
        spans,
        vec![(at(5, 9, 0), at(5, 10, 0)), (at(5, 14, 0), at(5, 14, 30))]
    );
    assert_eq!(result.attempts.len(), 1);
    assert!(result.fallback_reason.is_none());

    let post = transport.requests_to(DavMethod::Post, OUTBOX).remove(0);
    assert_eq!(post.header_value("Originator"), Some("mailto:me@icloud.com"));
    assert_eq!(post.header_value("Recipient"), Some("mailto:me@icloud.com"));
    assert_eq!(post.header_value("Content-Type"), Some("text/calendar; charset=utf-8"));
    let body = post.body_text();
    assert!(body.contains("METHOD:REQUEST\r\n"));
    assert!(body.contains("BEGIN:VFREEBUSY\r\n"));
    assert!(body.contains("DTSTART:20260305T000000Z\r\n"));
    assert!(body.contains("DTEND:20260306T000000Z\r\n"));
    assert_eq!(transport.count(DavMethod::Report), 0);
}

#[test]
fn test_forbidden_outbox_falls_through_to_events() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    transport.on(DavMethod::Post, OUTBOX, status(403, OUTBOX));

    let confirmed = event_ics("EV-1", "Standup", "20260305T090000Z", "20260305T100000Z", &[]);
    let cancelled = event_ics(
        "EV-2",
        "Dropped",
        "20260305T110000Z",
        "20260305T120000Z",
        &["STATUS:CANCELLED"],
    );
    let late = event_ics("EV-3", "Late call", "20260305T230000Z", "20260306T010000Z", &[]);
    // The free-busy REPORT answers without busy data, then the event listing.
    transport.on(
        DavMethod::Report,
        WORK,
        with_body(207, WORK, r#"<multistatus xmlns="DAV:"/>"#),
    );
    transport.on(
        DavMethod::Report,
        WORK,
        with_body(
            207,
            WORK,
            multistatus(&[
                ("/123/calendars/work/EV-1.ics", "\"a\"", &confirmed),
                ("/123/calendars/work/EV-2.ics", "\"b\"", &cancelled),
                ("/123/calendars/work/EV-3.ics", "\"c\"", &late),
            ]),
        ),
    );

    let result = client.free_busy("Work", &window()).unwrap();

    assert_eq!(result.method, FreeBusyMethod::EventFallback);
    assert_eq!(result.busy.len(), 2);
    assert_eq!(result.busy[0].summary.as_deref(), Some("Standup"));
    assert_eq!((result.busy[1].start, result.busy[1].end), (at(5, 23, 0), at(6, 0, 0)));
    assert!(result.fallback_reason.is_some());

    // Every address is tried on 403, then the report.
    let posts = transport.requests_to(DavMethod::Post, OUTBOX);
    let originators: Vec<_> = posts.iter().map(|p| p.header_value("Originator")).collect();
    assert_eq!(
        originators,
        vec![Some("mailto:me@icloud.com"), Some("mailto:alias@me.com")]
    );
    let methods: Vec<_> = result.attempts.iter().map(|a| a.method).collect();
    assert_eq!(
        methods,
        vec![
            FreeBusyMethod::OutboxPost,
            FreeBusyMethod::OutboxPost,
            FreeBusyMethod::CaldavReport
        ]
    );
    assert_eq!(result.attempts[2].http_status, Some(207));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["method"], "event_fallback");
    assert_eq!(json["busy"][0]["start"], "2026-03-05T09:00:00Z");
}

#[test]
fn test_forbidden_outbox_answered_by_collection_report() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    transport.on(DavMethod::Post, OUTBOX, status(403, OUTBOX));
    transport.on(
        DavMethod::Report,
        WORK,
        with_body(
            200,
            WORK,
            "BEGIN:VCALENDAR\r\nBEGIN:VFREEBUSY\r\n\
             FREEBUSY;FBTYPE=BUSY:20260305T080000Z/20260305T083000Z,20260305T130000Z/PT2H\r\n\
             FREEBUSY;FBTYPE=FREE:20260305T100000Z/20260305T110000Z\r\n\
             END:VFREEBUSY\r\nEND:VCALENDAR\r\n",
        ),
    );

    let result = client.free_busy("Work", &window()).unwrap();

    assert_eq!(result.method, FreeBusyMethod::CaldavReport);
    let spans: Vec<_> = result.busy.iter().map(|b| (b.start, b.end)).collect();
    assert_eq!(
        spans,
        vec![(at(5, 8, 0), at(5, 8, 30)), (at(5, 13, 0), at(5, 15, 0))]
    );
    assert!(result.error.is_none());

    let methods: Vec<_> = result.attempts.iter().map(|a| a.method).collect();
    assert_eq!(
        methods,
        vec![
            FreeBusyMethod::OutboxPost,
            FreeBusyMethod::OutboxPost,
            FreeBusyMethod::CaldavReport
        ]
    );
    assert_eq!(result.attempts[2].http_status, Some(200));

    // Only the free-busy REPORT; no event listing follows.
    let reports = transport.requests_to(DavMethod::Report, WORK);
    assert_eq!(reports.len(), 1);
    assert!(reports[0].body_text().contains("free-busy-query"));
    assert!(!reports[0].body_text().contains("calendar-query"));
    assert_eq!(reports[0].header_value("Depth"), Some("1"));
}

#[test]
fn test_outbox_server_error_stops_address_loop() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    transport.on(DavMethod::Post, OUTBOX, with_body(500, OUTBOX, "boom"));
    transport.on(
        DavMethod::Report,
        WORK,
        with_body(
            200,
            WORK,
            "BEGIN:VCALENDAR\r\nBEGIN:VFREEBUSY\r\nFREEBUSY:20260305T150000Z/PT1H\r\nEND:VFREEBUSY\r\nEND:VCALENDAR\r\n",
        ),
    );

    let result = client.free_busy("Work", &window()).unwrap();

    assert_eq!(result.method, FreeBusyMethod::CaldavReport);
    assert_eq!(result.busy.len(), 1);
    assert_eq!(result.busy[0].end, at(5, 16, 0));
    assert_eq!(transport.count(DavMethod::Post), 1);
    assert_eq!(result.attempts[0].http_status, Some(500));
    assert_eq!(result.attempts[0].result.as_deref(), Some("boom"));

    let report = transport.requests_to(DavMethod::Report, WORK).remove(0);
    assert!(report.body_text().contains("free-busy-query"));
    assert_eq!(report.header_value("Depth"), Some("1"));
}

#[test]
fn test_every_tier_failing_reports_error() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    transport.fail(DavMethod::Post, OUTBOX);
    transport.fail(DavMethod::Report, WORK);

    let result = client.free_busy("Work", &window()).unwrap();

    assert_eq!(result.method, FreeBusyMethod::Failed);
    assert!(result.busy.is_empty());
    assert_eq!(result.attempts.len(), 2);
    assert!(result.attempts[0].error.as_deref().unwrap().contains("connection refused"));
    assert_eq!(result.error.unwrap().kind, "transport_error");
}
