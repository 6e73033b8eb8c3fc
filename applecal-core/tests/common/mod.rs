//! Shared fixtures for component tests: a scripted transport and canned
//! iCloud-shaped responses.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use applecal_core::AppleCal;
use applecal_core::caldav::{DavMethod, DavRequest, DavResponse, DavTransport};
use applecal_core::error::{AppleCalError, CalResult};

pub const WELL_KNOWN: &str = "https://caldav.icloud.com/.well-known/caldav";
pub const ROOT: &str = "https://caldav.icloud.com/";
pub const PRINCIPAL: &str = "https://p42-caldav.icloud.com/123/principal/";
pub const HOME: &str = "https://p42-caldav.icloud.com/123/calendars/";
pub const OUTBOX: &str = "https://p42-caldav.icloud.com/123/calendars/outbox/";
pub const WORK: &str = "https://p42-caldav.icloud.com/123/calendars/work/";
pub const HOME_CAL: &str = "https://p42-caldav.icloud.com/123/calendars/home/";
pub const APPLE_ID: &str = "me@icloud.com";

/// Responses queued per (method, url). The last queued response for a key
/// is repeated once the queue is down to one. Unscripted requests get the
/// method default if one is set, else 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: RefCell<HashMap<(DavMethod, String), VecDeque<Scripted>>>,
    defaults: RefCell<HashMap<DavMethod, u16>>,
    log: RefCell<Vec<DavRequest>>,
}

#[derive(Clone)]
enum Scripted {
    Response(DavResponse),
    Unreachable,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, method: DavMethod, url: &str, response: DavResponse) -> &Self {
        self.routes
            .borrow_mut()
            .entry((method, url.to_string()))
            .or_default()
            .push_back(Scripted::Response(response));
        self
    }

    /// Status for any otherwise unscripted request with this method.
    pub fn default_status(&self, method: DavMethod, code: u16) -> &Self {
        self.defaults.borrow_mut().insert(method, code);
        self
    }

    /// Queue a transport failure for (method, url).
    pub fn fail(&self, method: DavMethod, url: &str) -> &Self {
        self.routes
            .borrow_mut()
            .entry((method, url.to_string()))
            .or_default()
            .push_back(Scripted::Unreachable);
        self
    }

    pub fn requests(&self) -> Vec<DavRequest> {
        self.log.borrow().clone()
    }

    pub fn requests_to(&self, method: DavMethod, url: &str) -> Vec<DavRequest> {
        self.log
            .borrow()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .cloned()
            .collect()
    }

    pub fn count(&self, method: DavMethod) -> usize {
        self.log.borrow().iter().filter(|r| r.method == method).count()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }
}

impl DavTransport for ScriptedTransport {
    fn send(&self, request: &DavRequest) -> CalResult<DavResponse> {
        self.log.borrow_mut().push(request.clone());

        let key = (request.method, request.url.clone());
        let next = {
            let mut routes = self.routes.borrow_mut();
            match routes.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match next {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Unreachable) => Err(AppleCalError::Transport {
                method: request.method.to_string(),
                url: request.url.clone(),
                message: "connection refused".to_string(),
            }),
            None => {
                let code = self.defaults.borrow().get(&request.method).copied();
                Ok(status(code.unwrap_or(404), &request.url))
            }
        }
    }
}

pub fn status(code: u16, url: &str) -> DavResponse {
    DavResponse {
        status: code,
        url: url.to_string(),
        etag: None,
        location: None,
        body: String::new(),
    }
}

pub fn with_body(code: u16, url: &str, body: impl Into<String>) -> DavResponse {
    DavResponse {
        body: body.into(),
        ..status(code, url)
    }
}

pub fn with_etag(code: u16, url: &str, body: impl Into<String>, etag: &str) -> DavResponse {
    DavResponse {
        etag: Some(etag.to_string()),
        ..with_body(code, url, body)
    }
}

/// Script the two discovery PROPFINDs. The well-known URL "redirects" to the
/// server root, so the principal href is relative to that root.
pub fn script_discovery(transport: &ScriptedTransport) {
    transport.on(
        DavMethod::Propfind,
        WELL_KNOWN,
        with_body(207, ROOT, principal_body()),
    );
    transport.on(
        DavMethod::Propfind,
        "https://caldav.icloud.com/123/principal/",
        with_body(207, PRINCIPAL, home_body()),
    );
}

pub fn principal_body() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<multistatus xmlns="DAV:">
  <response>
    <href>/</href>
    <propstat>
      <prop><current-user-principal><href>/123/principal/</href></current-user-principal></prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
</multistatus>"#
        .to_string()
}

pub fn home_body() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<multistatus xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <response>
    <href>/123/principal/</href>
    <propstat>
      <prop>
        <C:calendar-home-set><href>/123/calendars/</href></C:calendar-home-set>
        <C:schedule-outbox-URL><href>/123/calendars/outbox/</href></C:schedule-outbox-URL>
        <C:calendar-user-address-set>
          <href>mailto:alias@me.com</href>
          <href>mailto:me@icloud.com</href>
          <href>/123/principal/</href>
        </C:calendar-user-address-set>
      </prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
</multistatus>"#
        .to_string()
}

/// Depth-1 listing of the calendar home with Work, Home, a reminders list
/// and the home collection itself.
pub fn calendars_body() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<multistatus xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <response>
    <href>/123/calendars/</href>
    <propstat><prop><resourcetype><collection/></resourcetype></prop></propstat>
  </response>
  <response>
    <href>/123/calendars/work/</href>
    <propstat><prop>
      <displayname>Work</displayname>
      <resourcetype><collection/><C:calendar/></resourcetype>
      <C:supported-calendar-component-set><C:comp name="VEVENT"/></C:supported-calendar-component-set>
    </prop></propstat>
  </response>
  <response>
    <href>/123/calendars/home/</href>
    <propstat><prop>
      <displayname>Home</displayname>
      <resourcetype><collection/><C:calendar/></resourcetype>
      <C:supported-calendar-component-set><C:comp name="VEVENT"/><C:comp name="VTODO"/></C:supported-calendar-component-set>
    </prop></propstat>
  </response>
  <response>
    <href>/123/calendars/tasks/</href>
    <propstat><prop>
      <displayname>Reminders</displayname>
      <C:supported-calendar-component-set><C:comp name="VTODO"/></C:supported-calendar-component-set>
    </prop></propstat>
  </response>
</multistatus>"#
        .to_string()
}

pub fn script_calendars(transport: &ScriptedTransport) {
    transport.on(DavMethod::Propfind, HOME, with_body(207, HOME, calendars_body()));
}

/// A discovered client over `transport` with the calendar listing scripted.
pub fn connected(transport: &ScriptedTransport) -> AppleCal<&ScriptedTransport> {
    script_discovery(transport);
    script_calendars(transport);
    AppleCal::with_transport(transport, WELL_KNOWN, APPLE_ID).unwrap()
}

pub fn event_ics(uid: &str, summary: &str, start: &str, end: &str, extra: &[&str]) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{uid}"),
        format!("SUMMARY:{summary}"),
        format!("DTSTART:{start}"),
        format!("DTEND:{end}"),
    ];
    lines.extend(extra.iter().map(|l| l.to_string()));
    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());
    lines.join("\r\n") + "\r\n"
}

/// A calendar-query multistatus over (href, etag, ics) triples.
pub fn multistatus(resources: &[(&str, &str, &str)]) -> String {
    let mut body = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<multistatus xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">"#,
    );
    for (href, etag, ics) in resources {
        body.push_str(&format!(
            "<response><href>{href}</href><propstat><prop><getetag>{etag}</getetag><C:calendar-data>{}</C:calendar-data></prop><status>HTTP/1.1 200 OK</status></propstat></response>",
            ics.replace('&', "&amp;").replace('<', "&lt;")
        ));
    }
    body.push_str("</multistatus>");
    body
}
