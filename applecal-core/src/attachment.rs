//! Managed attachments (RFC 8607): upload and removal with verification.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::caldav::{DavMethod, DavRequest, DavTransport};
use crate::calendar::Calendar;
use crate::error::{AppleCalError, CalResult};
use crate::event::{require_non_empty, validate_uid};
use crate::ics::{attachments, build_ics_text, unfold};
use crate::mime::mime_for_path;
use crate::repository::EventRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentStatus {
    Attached,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentAdded {
    pub uid: String,
    /// Empty when the re-fetched event has no matching ATTACH line.
    pub managed_id: String,
    pub attach_url: Option<String>,
    pub status: AttachmentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentRemoved {
    pub uid: String,
    pub managed_id: String,
    pub status: AttachmentStatus,
    /// Whether the ATTACH line had to be stripped by rewriting the event.
    pub repaired: bool,
}

pub struct AttachmentManager<'a, T: DavTransport + ?Sized> {
    transport: &'a T,
    events: EventRepository<'a, T>,
}

impl<'a, T: DavTransport + ?Sized> AttachmentManager<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        AttachmentManager {
            transport,
            events: EventRepository::new(transport),
        }
    }

    /// Upload `path` as a managed attachment of event `uid`.
    pub fn add(&self, calendar: &Calendar, uid: &str, path: &Path) -> CalResult<AttachmentAdded> {
        validate_uid(uid)?;
        check_attachment_file(path)?;

        let event = self.events.fetch(calendar, uid)?;
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let url = format!("{}?action=attachment-add", event.url);
        let request = DavRequest::new(DavMethod::Post, &url)
            .header("Content-Type", mime_for_path(path))
            .header("Content-Disposition", format!("attachment; filename=\"{filename}\""))
            .header("Prefer", "return=representation")
            .body(data);
        let response = self.transport.send(&request)?;
        if !response.is_success() {
            return Err(AppleCalError::protocol("POST", &url, response.status, &response.body));
        }
        let attach_url = response.location;

        let refreshed = self.events.fetch(calendar, uid)?;
        let managed_id = attach_url
            .as_deref()
            .and_then(|attach_url| managed_id_for_url(&refreshed.body, attach_url))
            .unwrap_or_default();
        if managed_id.is_empty() {
            debug!(uid, "no ATTACH line matched the uploaded attachment");
        }

        Ok(AttachmentAdded {
            uid: uid.to_string(),
            managed_id,
            attach_url,
            status: AttachmentStatus::Attached,
        })
    }

    /// Remove the managed attachment `managed_id` from event `uid`.
    ///
    /// The server-side removal result is not trusted: the event is re-fetched
    /// and, if the reference is still there, the ATTACH line is stripped and
    /// the event rewritten. If a final re-fetch still shows it, this fails
    /// with [`AppleCalError::AttachmentState`].
    pub fn remove(
        &self,
        calendar: &Calendar,
        uid: &str,
        managed_id: &str,
    ) -> CalResult<AttachmentRemoved> {
        validate_uid(uid)?;
        require_non_empty("managed-id", managed_id)?;

        let event = self.events.fetch(calendar, uid)?;
        self.request_removal(&event.url, managed_id);

        let refreshed = self.events.fetch(calendar, uid)?;
        let mut repaired = false;
        if has_managed_id(&refreshed.body, managed_id) {
            debug!(uid, managed_id, "attachment still present, rewriting event");
            let body = strip_managed_attachment(&refreshed.body, managed_id);
            self.events.replace(&refreshed, uid, body)?;
            repaired = true;

            let verified = self.events.fetch(calendar, uid)?;
            if has_managed_id(&verified.body, managed_id) {
                return Err(AppleCalError::AttachmentState {
                    uid: uid.to_string(),
                    managed_id: managed_id.to_string(),
                });
            }
        }

        Ok(AttachmentRemoved {
            uid: uid.to_string(),
            managed_id: managed_id.to_string(),
            status: AttachmentStatus::Removed,
            repaired,
        })
    }

    /// Ask the server to drop the attachment. The outcome is only logged;
    /// the caller verifies by re-fetching.
    fn request_removal(&self, event_url: &str, managed_id: &str) {
        let encoded: String = form_urlencoded::byte_serialize(managed_id.as_bytes()).collect();

        let url = format!("{event_url}?action=attachment-remove&managed-id={encoded}");
        match self.transport.send(&DavRequest::new(DavMethod::Post, &url)) {
            Ok(response) if response.is_client_error() => {
                debug!(status = response.status, "attachment-remove rejected, trying DELETE");
                let url = format!("{event_url}?managed-id={encoded}");
                match self.transport.send(&DavRequest::delete(&url)) {
                    Ok(response) => debug!(status = response.status, "attachment DELETE"),
                    Err(err) => warn!(error = %err, "attachment DELETE failed"),
                }
            }
            Ok(response) => debug!(status = response.status, "attachment-remove"),
            Err(err) => warn!(error = %err, "attachment-remove failed"),
        }
    }
}

/// The upload source must be an existing regular file.
pub fn check_attachment_file(path: &Path) -> CalResult<()> {
    require_non_empty("file", &path.to_string_lossy())?;
    if !path.is_file() {
        return Err(AppleCalError::validation(format!(
            "Attachment file not found: {}",
            path.display()
        )));
    }
    Ok(())
}

/// MANAGED-ID of the ATTACH property that references `attach_url`.
fn managed_id_for_url(body: &str, attach_url: &str) -> Option<String> {
    attachments(body)
        .iter()
        .filter(|attach| attach.value.contains(attach_url))
        .find_map(|attach| attach.param("MANAGED-ID").map(str::to_string))
}

/// Whether the event still has an ATTACH property with this MANAGED-ID.
pub fn has_managed_id(body: &str, managed_id: &str) -> bool {
    attachments(body)
        .iter()
        .any(|attach| attach.param("MANAGED-ID") == Some(managed_id))
}

/// Drop the VEVENT's ATTACH lines carrying `managed_id`; every other line is
/// kept as written. The result is refolded.
pub fn strip_managed_attachment(body: &str, managed_id: &str) -> String {
    let dropped: Vec<usize> = attachments(body)
        .iter()
        .filter(|attach| attach.param("MANAGED-ID") == Some(managed_id))
        .filter_map(|attach| attach.index)
        .collect();

    let kept: Vec<String> = unfold(body)
        .into_iter()
        .enumerate()
        .filter(|(index, _)| !dropped.contains(index))
        .map(|(_, line)| line)
        .collect();

    build_ics_text(&kept)
}
