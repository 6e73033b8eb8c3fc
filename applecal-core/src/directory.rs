//! Calendar directory: collections under the calendar home.

use tracing::debug;

use crate::caldav::{DavRequest, DavTransport, absolute_url, body, xml};
use crate::calendar::Calendar;
use crate::error::{AppleCalError, CalResult};
use crate::event::require_non_empty;
use crate::session::Session;

/// List event-capable calendars via a depth-1 PROPFIND on calendar-home-set.
///
/// Collections without a display name or without VEVENT in their
/// supported-calendar-component-set are skipped.
pub fn list_calendars<T: DavTransport + ?Sized>(
    transport: &T,
    session: &Session,
) -> CalResult<Vec<Calendar>> {
    let request = DavRequest::propfind(&session.home_url, 1, body::calendar_collections());
    let response = transport.send(&request)?;
    if !response.is_success() {
        return Err(AppleCalError::protocol(
            "PROPFIND",
            &session.home_url,
            response.status,
            &response.body,
        ));
    }

    let calendars = xml::collections(&response.body)?
        .into_iter()
        .filter_map(|entry| {
            let name = entry.display_name?;
            let calendar = Calendar {
                name,
                url: absolute_url(&entry.href, &session.home_url),
                components: entry.components,
            };
            calendar.supports_events().then_some(calendar)
        })
        .collect::<Vec<_>>();

    debug!(count = calendars.len(), "listed calendars");
    Ok(calendars)
}

/// Case-insensitive exact match on the display name.
pub fn find_calendar<'a>(calendars: &'a [Calendar], name: &str) -> CalResult<&'a Calendar> {
    let wanted = name.trim();
    let lowered = wanted.to_lowercase();
    calendars
        .iter()
        .find(|c| c.name.to_lowercase() == lowered)
        .ok_or_else(|| AppleCalError::not_found("Calendar", wanted))
}

/// List calendars and resolve `name` to its collection.
pub fn resolve_calendar<T: DavTransport + ?Sized>(
    transport: &T,
    session: &Session,
    name: &str,
) -> CalResult<Calendar> {
    require_non_empty("calendar", name)?;
    let calendars = list_calendars(transport, session)?;
    find_calendar(&calendars, name).cloned()
}
