//! Session discovery.
//!
//! CalDAV discovery flow:
//! 1. PROPFIND on the well-known resource to get the user's principal URL
//! 2. PROPFIND on the principal for calendar-home-set, schedule-outbox-URL
//!    and calendar-user-address-set
//!
//! The result is built once and only read afterwards.

use serde::Serialize;
use tracing::{debug, info};

use crate::caldav::{DavRequest, DavResponse, DavTransport, absolute_url, body, xml};
use crate::error::{AppleCalError, CalResult};

/// Discovered CalDAV endpoints for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub apple_id: String,
    pub principal_url: String,
    pub home_url: String,
    /// Scheduling outbox. Without it, free/busy skips the outbox tier.
    pub outbox_url: Option<String>,
    /// calendar-user-address-set as returned by the server.
    pub address_set: Vec<String>,
    /// `mailto:` addresses, deduplicated, primary first.
    pub mail_addresses: Vec<String>,
}

impl Session {
    pub fn discover<T: DavTransport + ?Sized>(
        transport: &T,
        discovery_url: &str,
        apple_id: &str,
    ) -> CalResult<Self> {
        let response = propfind(transport, discovery_url, body::current_user_principal())?;
        let principal_href = xml::property_href(&response.body, "current-user-principal")?
            .ok_or_else(|| {
                AppleCalError::Discovery(format!(
                    "current-user-principal missing from {}",
                    response.url
                ))
            })?;
        // Relative to the final URL: the well-known resource redirects.
        let principal_url = absolute_url(&principal_href, &response.url);
        debug!(principal_url = %principal_url, "found principal");

        let response = propfind(transport, &principal_url, body::principal_properties())?;
        let home_href = xml::property_href(&response.body, "calendar-home-set")?.ok_or_else(|| {
            AppleCalError::Discovery(format!("calendar-home-set missing from {principal_url}"))
        })?;
        let home_url = absolute_url(&home_href, &response.url);

        let outbox_url = xml::property_href(&response.body, "schedule-outbox-URL")?
            .map(|href| absolute_url(&href, &home_url));
        let address_set = xml::property_hrefs(&response.body, "calendar-user-address-set")?;
        let mail_addresses = mail_addresses(&address_set, apple_id);

        info!(
            home_url = %home_url,
            outbox = outbox_url.as_deref().unwrap_or("-"),
            addresses = mail_addresses.len(),
            "discovered CalDAV session"
        );

        Ok(Session {
            apple_id: apple_id.to_string(),
            principal_url,
            home_url,
            outbox_url,
            address_set,
            mail_addresses,
        })
    }
}

fn propfind<T: DavTransport + ?Sized>(
    transport: &T,
    url: &str,
    xml_body: String,
) -> CalResult<DavResponse> {
    let response = transport.send(&DavRequest::propfind(url, 0, xml_body))?;
    if !response.is_success() {
        return Err(AppleCalError::Discovery(format!(
            "PROPFIND {url} failed with status {} (check the Apple ID and app-specific password)",
            response.status
        )));
    }
    Ok(response)
}

/// `mailto:` entries of the address set, deduplicated case-insensitively,
/// with `mailto:<apple_id>` moved to the front when present. Falls back to
/// `mailto:<apple_id>` alone when the set has no `mailto:` entry.
pub fn mail_addresses(address_set: &[String], apple_id: &str) -> Vec<String> {
    let mut addresses: Vec<String> = Vec::new();
    for entry in address_set {
        let entry = entry.trim();
        let is_mailto = entry
            .get(..7)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("mailto:"));
        if is_mailto && !addresses.iter().any(|a| a.eq_ignore_ascii_case(entry)) {
            addresses.push(entry.to_string());
        }
    }

    let primary = format!("mailto:{apple_id}");
    if let Some(idx) = addresses.iter().position(|a| a.eq_ignore_ascii_case(&primary)) {
        let first = addresses.remove(idx);
        addresses.insert(0, first);
    }

    if addresses.is_empty() {
        addresses.push(primary);
    }
    addresses
}
