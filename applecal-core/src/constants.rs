//! Protocol constants shared across modules.

/// Well-known CalDAV discovery resource for iCloud.
pub const ICLOUD_WELL_KNOWN: &str = "https://caldav.icloud.com/.well-known/caldav";

/// PRODID written into every generated calendar body.
pub const PRODID: &str = "-//OpenClaw//AppleCalPro 1.1//EN";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 500;

/// Redirect hops followed by the transport before giving up.
pub const MAX_REDIRECTS: usize = 10;

/// Content type for calendar bodies.
pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";
/// Content type for WebDAV XML bodies.
pub const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

pub const DAV_NS: &str = "DAV:";
pub const CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";

/// Compact UTC timestamp form used on the wire.
pub const CALDAV_DATETIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";
/// Compact date-only form used for all-day values.
pub const CALDAV_DATE_FORMAT: &str = "%Y%m%d";

/// Default `events list` window length.
pub const DEFAULT_LIST_DAYS: i64 = 7;

pub fn default_user_agent() -> String {
    format!("AppleCalPro/{}", env!("CARGO_PKG_VERSION"))
}
