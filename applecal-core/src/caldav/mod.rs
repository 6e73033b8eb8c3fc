//! CalDAV wire layer: transport, requests and XML bodies.

pub mod body;
mod request;
mod transport;
pub mod xml;

pub use request::{DavMethod, DavRequest, DavResponse};
pub use transport::{DavTransport, HttpTransport};
pub use xml::CalendarResource;

use url::Url;

/// Scheme, host and port of `url`, e.g. `https://p42-caldav.icloud.com`.
pub fn server_root(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}

/// Resolve an href against the server root of `base`. Absolute hrefs are
/// returned unchanged.
pub fn absolute_url(href: &str, base: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match server_root(base) {
        Some(root) if href.starts_with('/') => format!("{root}{href}"),
        Some(root) => format!("{root}/{href}"),
        None => href.to_string(),
    }
}

/// Rewrite `url` so it points at the server of `target_base`, keeping the
/// path and query. Returns `url` unchanged when either cannot be parsed.
pub fn rehost(url: &str, target_base: &str) -> String {
    let (Ok(mut parsed), Ok(target)) = (Url::parse(url), Url::parse(target_base)) else {
        return url.to_string();
    };
    if parsed.scheme() == target.scheme()
        && parsed.host_str() == target.host_str()
        && parsed.port_or_known_default() == target.port_or_known_default()
    {
        return url.to_string();
    }
    if parsed.set_scheme(target.scheme()).is_err()
        || parsed.set_host(target.host_str()).is_err()
        || parsed.set_port(target.port()).is_err()
    {
        return url.to_string();
    }
    parsed.to_string()
}
