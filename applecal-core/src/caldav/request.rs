//! Request and response values exchanged with a [`super::DavTransport`].

use std::fmt;

use crate::constants::{CALENDAR_CONTENT_TYPE, XML_CONTENT_TYPE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DavMethod {
    Get,
    Put,
    Delete,
    Post,
    Propfind,
    Report,
}

impl DavMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DavMethod::Get => "GET",
            DavMethod::Put => "PUT",
            DavMethod::Delete => "DELETE",
            DavMethod::Post => "POST",
            DavMethod::Propfind => "PROPFIND",
            DavMethod::Report => "REPORT",
        }
    }

    /// Whether a transient failure may be retried. POST never is.
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, DavMethod::Post)
    }
}

impl fmt::Display for DavMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavRequest {
    pub method: DavMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl DavRequest {
    pub fn new(method: DavMethod, url: impl Into<String>) -> Self {
        DavRequest {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(DavMethod::Get, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(DavMethod::Delete, url)
    }

    /// PUT a calendar body.
    pub fn put_calendar(url: impl Into<String>, ics: String) -> Self {
        Self::new(DavMethod::Put, url)
            .header("Content-Type", CALENDAR_CONTENT_TYPE)
            .body(ics.into_bytes())
    }

    pub fn propfind(url: impl Into<String>, depth: u8, xml: String) -> Self {
        Self::new(DavMethod::Propfind, url)
            .header("Depth", depth.to_string())
            .header("Content-Type", XML_CONTENT_TYPE)
            .body(xml.into_bytes())
    }

    pub fn report(url: impl Into<String>, depth: u8, xml: String) -> Self {
        Self::new(DavMethod::Report, url)
            .header("Depth", depth.to_string())
            .header("Content-Type", XML_CONTENT_TYPE)
            .body(xml.into_bytes())
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add `If-Match` when a concurrency token is known.
    pub fn if_match(self, etag: Option<&str>) -> Self {
        match etag {
            Some(etag) => self.header("If-Match", etag),
            None => self,
        }
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// First header value with the given name (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavResponse {
    pub status: u16,
    /// URL of the final response after redirects.
    pub url: String,
    pub etag: Option<String>,
    pub location: Option<String>,
    pub body: String,
}

impl DavResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_post_is_not_idempotent() {
        assert!(DavMethod::Get.is_idempotent());
        assert!(DavMethod::Report.is_idempotent());
        assert!(!DavMethod::Post.is_idempotent());
    }

    #[test]
    fn test_if_match_is_optional() {
        let req = DavRequest::delete("https://h/e.ics").if_match(Some("\"abc\""));
        assert_eq!(req.header_value("if-match"), Some("\"abc\""));
        let req = DavRequest::delete("https://h/e.ics").if_match(None);
        assert_eq!(req.header_value("If-Match"), None);
    }

    #[test]
    fn test_report_sets_depth() {
        let req = DavRequest::report("https://h/cal/", 1, "<x/>".into());
        assert_eq!(req.method.as_str(), "REPORT");
        assert_eq!(req.header_value("Depth"), Some("1"));
        assert_eq!(req.body_text(), "<x/>");
    }
}
