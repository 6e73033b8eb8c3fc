//! App-specific password lookup.
//!
//! Order: the `APPLECAL_PASSWORD` environment variable, then (macOS only)
//! the login keychain via `security find-internet-password`.

use std::process::Command;

use anyhow::{Result, bail};
use secrecy::Secret;
use tracing::debug;

const PASSWORD_ENV: &str = "APPLECAL_PASSWORD";
const KEYCHAIN_SERVER: &str = "caldav.icloud.com";

pub fn lookup(apple_id: &str) -> Result<Secret<String>> {
    if let Some(password) = from_env() {
        debug!("using {PASSWORD_ENV}");
        return Ok(password);
    }

    if !cfg!(target_os = "macos") {
        bail!(
            "No password found. Set the {PASSWORD_ENV} environment variable:\n  \
            export {PASSWORD_ENV}='your-app-specific-password'"
        );
    }

    from_keychain(apple_id)
}

fn from_env() -> Option<Secret<String>> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(Secret::new)
}

fn from_keychain(apple_id: &str) -> Result<Secret<String>> {
    let output = Command::new("security")
        .args(["find-internet-password", "-s", KEYCHAIN_SERVER, "-a", apple_id, "-w"])
        .output();

    let password = match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        _ => String::new(),
    };

    if password.is_empty() {
        bail!(
            "No password found for {apple_id}. Either set {PASSWORD_ENV}:\n  \
            export {PASSWORD_ENV}='your-app-specific-password'\n\
            or store it in the keychain:\n  \
            security add-internet-password -s '{KEYCHAIN_SERVER}' -a '{apple_id}' -w 'YOUR_APP_SPECIFIC_PASSWORD'"
        );
    }

    debug!("using keychain entry for {KEYCHAIN_SERVER}");
    Ok(Secret::new(password))
}
