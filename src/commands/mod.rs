pub mod attach;
pub mod calendars;
pub mod doctor;
pub mod event;
pub mod events;
pub mod freebusy;

use anyhow::Result;
use applecal_core::caldav::HttpTransport;
use applecal_core::event::validate_apple_id;
use applecal_core::{AppleCal, AppleCalError, ClientConfig};

use crate::credentials;

/// Settings shared by every command. Nothing here touches the network;
/// commands validate their own input first and only then call [`Context::connect`].
pub struct Context {
    config: ClientConfig,
    apple_id: String,
}

impl Context {
    pub fn new(apple_id: Option<&str>) -> Result<Self> {
        let config = ClientConfig::load()?;

        let apple_id = apple_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| config.apple_id.clone())
            .ok_or_else(|| {
                AppleCalError::validation(
                    "Missing --apple-id. Provide your iCloud account email, e.g. --apple-id you@icloud.com",
                )
            })?;
        validate_apple_id(&apple_id)?;

        Ok(Context { config, apple_id })
    }

    /// Look up the password and run discovery.
    pub fn connect(&self) -> Result<AppleCal<HttpTransport>> {
        let password = credentials::lookup(&self.apple_id)?;
        Ok(AppleCal::connect(&self.config, &self.apple_id, password)?)
    }
}
