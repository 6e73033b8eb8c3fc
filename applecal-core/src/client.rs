//! Account-level entry point: one discovered session over one transport.
//!
//! Every operation that takes a calendar name resolves it against a fresh
//! directory listing. Input validation runs before the first request.

use std::path::Path;

use secrecy::Secret;
use serde::Serialize;

use crate::aggregate::{Aggregator, EventListing, FreeBusyOverview};
use crate::attachment::{
    AttachmentAdded, AttachmentManager, AttachmentRemoved, check_attachment_file,
};
use crate::caldav::{DavTransport, HttpTransport};
use crate::calendar::Calendar;
use crate::config::ClientConfig;
use crate::date_range::TimeWindow;
use crate::directory::{list_calendars, resolve_calendar};
use crate::error::{AppleCalError, CalResult};
use crate::event::{
    Event, EventUpdate, NewEvent, require_non_empty, validate_apple_id, validate_uid,
};
use crate::freebusy::{FreeBusyResolver, FreeBusyResult};
use crate::repository::{EventRepository, WriteResult};
use crate::session::Session;

/// Connectivity report for `doctor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorReport {
    pub ok: bool,
    #[serde(flatten)]
    pub session: Session,
    pub calendar_count: usize,
    pub calendars: Vec<String>,
}

pub struct AppleCal<T: DavTransport> {
    transport: T,
    session: Session,
}

impl AppleCal<HttpTransport> {
    /// Build the HTTP transport from `config` and discover the account.
    pub fn connect(
        config: &ClientConfig,
        apple_id: &str,
        password: Secret<String>,
    ) -> CalResult<Self> {
        validate_apple_id(apple_id)?;
        let transport = HttpTransport::new(config, apple_id, password)?;
        AppleCal::with_transport(transport, &config.discovery_url, apple_id)
    }
}

impl<T: DavTransport> AppleCal<T> {
    pub fn with_transport(transport: T, discovery_url: &str, apple_id: &str) -> CalResult<Self> {
        validate_apple_id(apple_id)?;
        let session = Session::discover(&transport, discovery_url, apple_id)?;
        Ok(AppleCal { transport, session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn doctor(&self) -> CalResult<DoctorReport> {
        let calendars = self.calendars()?;
        Ok(DoctorReport {
            ok: true,
            session: self.session.clone(),
            calendar_count: calendars.len(),
            calendars: calendars.into_iter().map(|c| c.name).collect(),
        })
    }

    pub fn calendars(&self) -> CalResult<Vec<Calendar>> {
        list_calendars(&self.transport, &self.session)
    }

    pub fn calendar(&self, name: &str) -> CalResult<Calendar> {
        resolve_calendar(&self.transport, &self.session, name)
    }

    pub fn list_events(
        &self,
        calendar: &str,
        window: &TimeWindow,
        query: Option<&str>,
    ) -> CalResult<Vec<Event>> {
        let calendar = self.calendar(calendar)?;
        self.repository().list(&calendar, window, query)
    }

    /// Fetch a single event, failing with `NotFound` when it does not exist.
    pub fn get_event(&self, calendar: &str, uid: &str) -> CalResult<Event> {
        validate_uid(uid)?;
        let calendar = self.calendar(calendar)?;
        self.repository()
            .get_event(&calendar, uid)?
            .ok_or_else(|| AppleCalError::not_found("Event", uid))
    }

    pub fn create_event(&self, calendar: &str, new: &NewEvent) -> CalResult<WriteResult> {
        new.validate()?;
        let calendar = self.calendar(calendar)?;
        self.repository().create(&calendar, new)
    }

    pub fn update_event(
        &self,
        calendar: &str,
        uid: &str,
        update: &EventUpdate,
    ) -> CalResult<WriteResult> {
        validate_uid(uid)?;
        update.validate()?;
        let calendar = self.calendar(calendar)?;
        self.repository().update(&calendar, uid, update)
    }

    pub fn delete_event(&self, calendar: &str, uid: &str) -> CalResult<WriteResult> {
        validate_uid(uid)?;
        let calendar = self.calendar(calendar)?;
        self.repository().delete(&calendar, uid)
    }

    /// Free/busy for one calendar. Lookup failures are errors; once the
    /// calendar is known the tiered resolution itself never fails.
    pub fn free_busy(&self, calendar: &str, window: &TimeWindow) -> CalResult<FreeBusyResult> {
        let calendar = self.calendar(calendar)?;
        Ok(FreeBusyResolver::new(&self.transport, &self.session).resolve(&calendar, window))
    }

    pub fn free_busy_all(
        &self,
        calendars: &[String],
        window: &TimeWindow,
    ) -> CalResult<FreeBusyOverview> {
        Aggregator::new(&self.transport, &self.session).free_busy(calendars, window)
    }

    pub fn list_events_all(
        &self,
        calendars: &[String],
        window: &TimeWindow,
        query: Option<&str>,
        max_items: Option<i64>,
    ) -> CalResult<EventListing> {
        Aggregator::new(&self.transport, &self.session)
            .list_events(calendars, window, query, max_items)
    }

    pub fn add_attachment(
        &self,
        calendar: &str,
        uid: &str,
        path: &Path,
    ) -> CalResult<AttachmentAdded> {
        validate_uid(uid)?;
        check_attachment_file(path)?;
        let calendar = self.calendar(calendar)?;
        AttachmentManager::new(&self.transport).add(&calendar, uid, path)
    }

    pub fn remove_attachment(
        &self,
        calendar: &str,
        uid: &str,
        managed_id: &str,
    ) -> CalResult<AttachmentRemoved> {
        validate_uid(uid)?;
        require_non_empty("managed-id", managed_id)?;
        let calendar = self.calendar(calendar)?;
        AttachmentManager::new(&self.transport).remove(&calendar, uid, managed_id)
    }

    fn repository(&self) -> EventRepository<'_, T> {
        EventRepository::new(&self.transport)
    }
}
