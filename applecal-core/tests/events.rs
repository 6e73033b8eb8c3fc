mod common;

use applecal_core::caldav::DavMethod;
use applecal_core::date_range::TimeWindow;
use applecal_core::error::AppleCalError;
use applecal_core::repository::WriteStatus;
use applecal_core::{EventPatch, EventTime, EventUpdate, NewEvent};
use chrono::{TimeZone, Utc};
use common::*;

const EV1: &str = "https://p42-caldav.icloud.com/123/calendars/work/EV-1.ics";
const ATTACH: &str = "ATTACH;MANAGED-ID=M-1;FILENAME=a.pdf:https://p42.icloud.com/att/a.pdf";

fn window() -> TimeWindow {
    TimeWindow::parse("2026-03-05T00:00:00Z", "2026-03-06T00:00:00Z").unwrap()
}

#[test]
fn test_create_then_get_returns_stored_event() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    transport.default_status(DavMethod::Put, 201);

    let created = client
        .create_event(
            "Work",
            &NewEvent {
                summary: "Sync".into(),
                start: "2026-03-05T09:00:00Z".into(),
                end: "2026-03-05T09:30:00Z".into(),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(created.status, WriteStatus::Created);
    assert_eq!(created.uid, created.uid.to_uppercase());

    let url = created.url.clone().unwrap();
    assert_eq!(url, format!("{WORK}{}.ics", created.uid));

    let put = transport.requests_to(DavMethod::Put, &url).remove(0);
    assert_eq!(put.header_value("Content-Type"), Some("text/calendar; charset=utf-8"));
    assert!(put.header_value("If-Match").is_none());
    let stored = put.body_text();
    assert!(stored.contains(&format!("UID:{}\r\n", created.uid)));

    transport.on(DavMethod::Get, &url, with_etag(200, &url, stored, "\"etag-1\""));
    let event = client.get_event("work", &created.uid).unwrap();

    assert_eq!(event.summary.as_deref(), Some("Sync"));
    assert_eq!(
        event.start,
        Some(EventTime::DateTime(Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap()))
    );
    assert_eq!(
        event.end,
        Some(EventTime::DateTime(Utc.with_ymd_and_hms(2026, 3, 5, 9, 30, 0).unwrap()))
    );
    assert!(!event.all_day);
    assert_eq!(event.etag.as_deref(), Some("\"etag-1\""));
    assert_eq!(event.href.as_deref(), Some(url.as_str()));
}

#[test]
fn test_create_validates_before_any_request() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    transport.clear_log();

    let err = client
        .create_event(
            "Work",
            &NewEvent {
                summary: "Backwards".into(),
                start: "2026-03-05T10:00:00Z".into(),
                end: "2026-03-05T09:00:00Z".into(),
                ..Default::default()
            },
        )
        .unwrap_err();

    assert!(err.is_validation());
    assert!(transport.requests().is_empty());
}

#[test]
fn test_create_all_day_same_day_spans_one_day() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    transport.default_status(DavMethod::Put, 201);

    let created = client
        .create_event(
            "Home",
            &NewEvent {
                summary: "Offsite".into(),
                start: "2026-03-10".into(),
                end: "2026-03-10".into(),
                all_day: true,
                ..Default::default()
            },
        )
        .unwrap();

    let body = transport
        .requests_to(DavMethod::Put, created.url.as_deref().unwrap())
        .remove(0)
        .body_text();
    assert!(body.contains("DTSTART;VALUE=DATE:20260310\r\n"));
    assert!(body.contains("DTEND;VALUE=DATE:20260311\r\n"));
}

#[test]
fn test_get_falls_back_to_uid_report() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    let ics = event_ics("EV-1", "Moved", "20260305T090000Z", "20260305T100000Z", &[]);
    transport.on(
        DavMethod::Report,
        WORK,
        with_body(207, WORK, multistatus(&[("/123/calendars/work/renamed.ics", "\"e9\"", &ics)])),
    );

    let event = client.get_event("Work", "EV-1").unwrap();
    assert_eq!(event.summary.as_deref(), Some("Moved"));
    assert_eq!(
        event.href.as_deref(),
        Some("https://p42-caldav.icloud.com/123/calendars/work/renamed.ics")
    );

    let report = transport.requests_to(DavMethod::Report, WORK).remove(0);
    assert!(report.body_text().contains("EV-1"));
    assert!(report.body_text().contains("i;octet"));
}

#[test]
fn test_uid_search_ignores_partial_matches() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    let longer = event_ics("ABC-123", "Other", "20260305T090000Z", "20260305T100000Z", &[]);
    transport.on(
        DavMethod::Report,
        WORK,
        with_body(207, WORK, multistatus(&[("/123/calendars/work/ABC-123.ics", "\"x\"", &longer)])),
    );

    assert_eq!(client.get_event("Work", "ABC").unwrap_err().kind(), "not_found_error");
    assert_eq!(client.delete_event("Work", "ABC").unwrap_err().kind(), "not_found_error");
    let patch = EventPatch {
        summary: Some("Renamed".into()),
        ..Default::default()
    };
    let err = client
        .update_event("Work", "ABC", &EventUpdate::Fields(patch))
        .unwrap_err();
    assert_eq!(err.kind(), "not_found_error");

    assert_eq!(transport.count(DavMethod::Delete), 0);
    assert_eq!(transport.count(DavMethod::Put), 0);
}

#[test]
fn test_uid_search_picks_the_exact_match() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    let longer = event_ics("ABC-123", "Other", "20260305T090000Z", "20260305T100000Z", &[]);
    let exact = event_ics("ABC", "Mine", "20260305T110000Z", "20260305T120000Z", &[]);
    transport.on(
        DavMethod::Report,
        WORK,
        with_body(
            207,
            WORK,
            multistatus(&[
                ("/123/calendars/work/ABC-123.ics", "\"x\"", &longer),
                ("/123/calendars/work/moved.ics", "\"y\"", &exact),
            ]),
        ),
    );

    let event = client.get_event("Work", "ABC").unwrap();
    assert_eq!(event.uid, "ABC");
    assert_eq!(event.summary.as_deref(), Some("Mine"));
    assert_eq!(event.etag.as_deref(), Some("\"y\""));
}

#[test]
fn test_get_missing_event_is_not_found() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    transport.on(DavMethod::Report, WORK, with_body(207, WORK, multistatus(&[])));

    let err = client.get_event("Work", "EV-404").unwrap_err();
    assert_eq!(err.kind(), "not_found_error");
}

#[test]
fn test_update_merges_fields_and_keeps_attachments() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    let current = event_ics(
        "EV-1",
        "Sync",
        "20260305T090000Z",
        "20260305T093000Z",
        &["LOCATION:Room 1", "STATUS:TENTATIVE", ATTACH],
    );
    transport.on(DavMethod::Get, EV1, with_etag(200, EV1, current, "\"e1\""));
    transport.on(DavMethod::Put, EV1, status(204, EV1));

    let result = client
        .update_event(
            "Work",
            "EV-1",
            &EventUpdate::Fields(EventPatch {
                summary: Some("Sync, renamed".into()),
                ..Default::default()
            }),
        )
        .unwrap();
    assert_eq!(result.status, WriteStatus::Updated);

    let put = transport.requests_to(DavMethod::Put, EV1).remove(0);
    assert_eq!(put.header_value("If-Match"), Some("\"e1\""));
    let body = put.body_text();
    assert!(body.contains("SUMMARY:Sync\\, renamed\r\n"));
    assert!(body.contains("LOCATION:Room 1\r\n"));
    assert!(body.contains("STATUS:TENTATIVE\r\n"));
    assert!(body.contains("DTSTART:20260305T090000Z\r\n"));
    assert!(body.contains("DTEND:20260305T093000Z\r\n"));
    assert!(body.contains(ATTACH));
}

#[test]
fn test_update_to_all_day_converts_current_times() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    let current = event_ics("EV-1", "Sync", "20260305T090000Z", "20260305T093000Z", &[]);
    transport.on(DavMethod::Get, EV1, with_etag(200, EV1, current, "\"e1\""));
    transport.on(DavMethod::Put, EV1, status(204, EV1));

    client
        .update_event(
            "Work",
            "EV-1",
            &EventUpdate::Fields(EventPatch {
                all_day: Some(true),
                ..Default::default()
            }),
        )
        .unwrap();

    let body = transport.requests_to(DavMethod::Put, EV1).remove(0).body_text();
    assert!(body.contains("DTSTART;VALUE=DATE:20260305\r\n"));
    assert!(body.contains("DTEND;VALUE=DATE:20260306\r\n"));
}

#[test]
fn test_update_rejects_inverted_merged_range() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    let current = event_ics("EV-1", "Sync", "20260305T090000Z", "20260305T093000Z", &[]);
    transport.on(DavMethod::Get, EV1, with_etag(200, EV1, current, "\"e1\""));

    let err = client
        .update_event(
            "Work",
            "EV-1",
            &EventUpdate::Fields(EventPatch {
                start: Some("2026-03-05T12:00:00Z".into()),
                ..Default::default()
            }),
        )
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(transport.count(DavMethod::Put), 0);
}

#[test]
fn test_update_conflict_on_precondition_failure() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    let current = event_ics("EV-1", "Sync", "20260305T090000Z", "20260305T093000Z", &[]);
    transport.on(DavMethod::Get, EV1, with_etag(200, EV1, current, "\"stale\""));
    transport.on(DavMethod::Put, EV1, status(412, EV1));

    let err = client
        .update_event(
            "Work",
            "EV-1",
            &EventUpdate::Raw("BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n".into()),
        )
        .unwrap_err();

    match err {
        AppleCalError::Conflict { url, etag } => {
            assert_eq!(url, EV1);
            assert_eq!(etag, "\"stale\"");
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(transport.count(DavMethod::Put), 1);
}

#[test]
fn test_raw_update_is_stored_verbatim() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    let current = event_ics("EV-1", "Sync", "20260305T090000Z", "20260305T093000Z", &[]);
    transport.on(DavMethod::Get, EV1, with_etag(200, EV1, current, "\"e1\""));
    transport.on(DavMethod::Put, EV1, status(204, EV1));

    let raw = event_ics("EV-1", "Raw", "20260305T110000Z", "20260305T120000Z", &["X-CUSTOM:1"]);
    client
        .update_event("Work", "EV-1", &EventUpdate::Raw(raw.clone()))
        .unwrap();

    assert_eq!(transport.requests_to(DavMethod::Put, EV1).remove(0).body_text(), raw);
}

#[test]
fn test_empty_patch_is_rejected_before_any_request() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    transport.clear_log();

    let err = client
        .update_event("Work", "EV-1", &EventUpdate::Fields(EventPatch::default()))
        .unwrap_err();
    assert!(err.is_validation());
    assert!(transport.requests().is_empty());
}

#[test]
fn test_delete_sends_if_match() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    let current = event_ics("EV-1", "Sync", "20260305T090000Z", "20260305T093000Z", &[]);
    transport.on(DavMethod::Get, EV1, with_etag(200, EV1, current, "\"e1\""));
    transport.on(DavMethod::Delete, EV1, status(204, EV1));

    let result = client.delete_event("Work", "EV-1").unwrap();
    assert_eq!(result.status, WriteStatus::Deleted);
    assert!(result.url.is_none());

    let delete = transport.requests_to(DavMethod::Delete, EV1).remove(0);
    assert_eq!(delete.header_value("If-Match"), Some("\"e1\""));
}

#[test]
fn test_delete_gone_event_is_not_found() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    let current = event_ics("EV-1", "Sync", "20260305T090000Z", "20260305T093000Z", &[]);
    transport.on(DavMethod::Get, EV1, with_etag(200, EV1, current, "\"e1\""));
    transport.on(DavMethod::Delete, EV1, status(404, EV1));

    let err = client.delete_event("Work", "EV-1").unwrap_err();
    assert_eq!(err.kind(), "not_found_error");
}

#[test]
fn test_invalid_uid_is_rejected_before_any_request() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    transport.clear_log();

    assert!(client.delete_event("Work", "../escape").unwrap_err().is_validation());
    assert!(client.get_event("Work", "").unwrap_err().is_validation());
    assert!(transport.requests().is_empty());
}

#[test]
fn test_list_filters_by_text_and_skips_unparseable() {
    let transport = ScriptedTransport::new();
    let client = connected(&transport);
    let standup = event_ics(
        "EV-1",
        "Standup",
        "20260305T090000Z",
        "20260305T091500Z",
        &["DESCRIPTION:Daily sync"],
    );
    let lunch = event_ics("EV-2", "Lunch", "20260305T120000Z", "20260305T130000Z", &[]);
    let todo = "BEGIN:VCALENDAR\r\nBEGIN:VTODO\r\nUID:T-1\r\nEND:VTODO\r\nEND:VCALENDAR\r\n";
    transport.on(
        DavMethod::Report,
        WORK,
        with_body(
            207,
            WORK,
            multistatus(&[
                ("/123/calendars/work/EV-1.ics", "\"a\"", &standup),
                ("/123/calendars/work/EV-2.ics", "\"b\"", &lunch),
                ("/123/calendars/work/T-1.ics", "\"c\"", todo),
            ]),
        ),
    );

    let all = client.list_events("Work", &window(), None).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(
        all[1].href.as_deref(),
        Some("https://p42-caldav.icloud.com/123/calendars/work/EV-2.ics")
    );

    let filtered = client.list_events("Work", &window(), Some("SYNC")).unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].uid, "EV-1");
    assert_eq!(filtered[0].etag.as_deref(), Some("\"a\""));

    let report = transport.requests_to(DavMethod::Report, WORK).remove(0);
    assert_eq!(report.header_value("Depth"), Some("1"));
    assert!(report.body_text().contains(r#"start="20260305T000000Z" end="20260306T000000Z""#));
}
