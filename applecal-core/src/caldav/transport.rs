//! Authenticated HTTP transport with bounded retry.
//!
//! Redirects are followed here rather than by reqwest: iCloud answers the
//! well-known resource with a redirect to a per-user host, and reqwest would
//! drop the WebDAV method and the credentials on the way.

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{ETAG, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Method, Url};
use secrecy::{ExposeSecret, Secret};
use tracing::{debug, warn};

use super::request::{DavMethod, DavRequest, DavResponse};
use crate::config::ClientConfig;
use crate::constants::MAX_REDIRECTS;
use crate::error::{AppleCalError, CalResult};

/// The seam every component sends requests through.
pub trait DavTransport {
    fn send(&self, request: &DavRequest) -> CalResult<DavResponse>;
}

impl<T: DavTransport + ?Sized> DavTransport for &T {
    fn send(&self, request: &DavRequest) -> CalResult<DavResponse> {
        (**self).send(request)
    }
}

impl<T: DavTransport + ?Sized> DavTransport for Box<T> {
    fn send(&self, request: &DavRequest) -> CalResult<DavResponse> {
        (**self).send(request)
    }
}

/// Statuses treated as transient server failures.
fn is_transient(status: u16) -> bool {
    matches!(status, 500 | 502 | 503 | 504)
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

enum SendError {
    Http(reqwest::Error),
    Redirect(String),
}

impl SendError {
    fn is_retryable(&self) -> bool {
        match self {
            SendError::Http(err) => err.is_connect() || err.is_timeout(),
            SendError::Redirect(_) => false,
        }
    }

    fn message(&self) -> String {
        match self {
            SendError::Http(err) => err.to_string(),
            SendError::Redirect(msg) => msg.clone(),
        }
    }
}

/// Blocking HTTP transport with basic auth.
pub struct HttpTransport {
    client: Client,
    username: String,
    password: Secret<String>,
    max_retries: u32,
    backoff: Duration,
}

impl HttpTransport {
    pub fn new(
        config: &ClientConfig,
        username: impl Into<String>,
        password: Secret<String>,
    ) -> CalResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|e| AppleCalError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(HttpTransport {
            client,
            username: username.into(),
            password,
            max_retries: config.max_retries,
            backoff: config.backoff(),
        })
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1u32 << attempt.min(16))
    }

    fn transport_error(request: &DavRequest, message: impl Into<String>) -> AppleCalError {
        AppleCalError::Transport {
            method: request.method.to_string(),
            url: request.url.clone(),
            message: message.into(),
        }
    }

    /// One logical attempt, following redirects.
    fn send_following(&self, request: &DavRequest) -> Result<DavResponse, SendError> {
        let mut method = request.method;
        let mut url = request.url.clone();
        let mut authenticate = true;

        for _ in 0..=MAX_REDIRECTS {
            let response = self.execute(method, &url, request, authenticate)?;
            let status = response.status().as_u16();

            if is_redirect(status) {
                if let Some(next) = header(&response, LOCATION.as_str()) {
                    let target = resolve_location(&url, &next)?;
                    if authenticate && is_downgrade(&url, &target) {
                        warn!(
                            from = %url,
                            to = %target,
                            "redirect leaves https, dropping credentials"
                        );
                        authenticate = false;
                    }
                    url = target;
                    if status == 303 {
                        method = DavMethod::Get;
                    }
                    debug!(status, to = %url, "following redirect");
                    continue;
                }
            }

            return into_dav_response(response);
        }

        Err(SendError::Redirect(format!(
            "more than {MAX_REDIRECTS} redirects"
        )))
    }

    fn execute(
        &self,
        method: DavMethod,
        url: &str,
        request: &DavRequest,
        authenticate: bool,
    ) -> Result<Response, SendError> {
        let http_method = Method::from_bytes(method.as_str().as_bytes())
            .map_err(|e| SendError::Redirect(e.to_string()))?;

        let mut builder = self.client.request(http_method, url);
        if authenticate {
            builder = builder.basic_auth(&self.username, Some(self.password.expose_secret()));
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        // A 303 turns the request into a bodiless GET.
        if method == request.method {
            builder = builder.body(request.body.clone());
        }

        debug!(method = %method, url, "sending request");
        builder.send().map_err(SendError::Http)
    }
}

impl DavTransport for HttpTransport {
    fn send(&self, request: &DavRequest) -> CalResult<DavResponse> {
        let retryable = request.method.is_idempotent();
        let mut attempt = 0;

        loop {
            match self.send_following(request) {
                Ok(response) if retryable && is_transient(response.status) => {
                    if attempt >= self.max_retries {
                        return Err(Self::transport_error(
                            request,
                            format!(
                                "gave up after {} attempts, last status {}",
                                attempt + 1,
                                response.status
                            ),
                        ));
                    }
                    warn!(
                        method = %request.method,
                        url = %request.url,
                        status = response.status,
                        attempt = attempt + 1,
                        "transient server error, retrying"
                    );
                }
                Ok(response) => {
                    debug!(
                        method = %request.method,
                        url = %response.url,
                        status = response.status,
                        "response"
                    );
                    return Ok(response);
                }
                Err(err) if retryable && err.is_retryable() && attempt < self.max_retries => {
                    warn!(
                        method = %request.method,
                        url = %request.url,
                        error = %err.message(),
                        attempt = attempt + 1,
                        "request failed, retrying"
                    );
                }
                Err(err) => return Err(Self::transport_error(request, err.message())),
            }

            thread::sleep(self.delay(attempt));
            attempt += 1;
        }
    }
}

fn header(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn resolve_location(current: &str, location: &str) -> Result<String, SendError> {
    let base = Url::parse(current).map_err(|e| SendError::Redirect(e.to_string()))?;
    base.join(location)
        .map(String::from)
        .map_err(|e| SendError::Redirect(format!("invalid redirect location {location:?}: {e}")))
}

/// True when a redirect hop moves from https to plain http.
fn is_downgrade(from: &str, to: &str) -> bool {
    let scheme = |url: &str| Url::parse(url).map(|u| u.scheme().to_string()).ok();
    scheme(from).as_deref() == Some("https") && scheme(to).as_deref() != Some("https")
}

fn into_dav_response(response: Response) -> Result<DavResponse, SendError> {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let etag = header(&response, ETAG.as_str());
    let location = header(&response, LOCATION.as_str());
    let body = response.text().map_err(SendError::Http)?;

    Ok(DavResponse {
        status,
        url,
        etag,
        location,
        body,
    })
}
