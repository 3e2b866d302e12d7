//! HTTP fetching.
//!
//! Every component receives a [`Fetcher`] instead of reaching for a global
//! client. [`HttpFetcher`] is the real implementation built from an explicit
//! [`HttpConfig`]; [`StaticFetcher`] serves canned responses for tests and
//! offline runs.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode, redirect};
use tracing::{debug, trace};

use crate::error::{ProviderError, ProviderResult};

/// A boxed future for async trait methods.
///
/// Boxed futures keep [`Fetcher`] object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Literal that opens every iCalendar payload.
pub const CALENDAR_MARKER: &[u8] = b"BEGIN:VCALENDAR";

/// Returns true if `body` looks like an iCalendar export.
///
/// This is the only admission test for candidate URLs.
pub fn is_calendar_payload(body: &[u8]) -> bool {
    body.windows(CALENDAR_MARKER.len())
        .any(|window| window == CALENDAR_MARKER)
}

/// HTTP client settings shared by all requests of a run.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// User agent string sent with every request.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum number of redirects followed.
    pub max_redirects: usize,
}

impl HttpConfig {
    /// Default user agent; some Rapla installations reject unknown agents.
    pub const DEFAULT_USER_AGENT: &'static str = "Mozilla/5.0 (Rapla-ICS-Downloader)";

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default redirect limit.
    pub const DEFAULT_MAX_REDIRECTS: usize = 10;

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: Self::DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            max_redirects: Self::DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// Fetches the body of a URL.
///
/// Implementations fail on transport errors and non-success statuses; callers
/// decide whether that failure is fatal.
pub trait Fetcher: Send + Sync {
    /// Performs a GET request and returns the raw body.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ProviderResult<Vec<u8>>>;
}

/// [`Fetcher`] backed by `reqwest`.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a new fetcher with the given configuration.
    pub fn new(config: &HttpConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| {
                ProviderError::network(format!("Failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> ProviderResult<Vec<u8>> {
        trace!(url = %url, "Sending request");

        let response = self.client.get(url).send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "Request timed out".to_string()
            } else {
                format!("Request failed: {}", e)
            };
            ProviderError::network(message).with_url(url)
        })?;

        handle_response(url, response).await
    }
}

impl Fetcher for HttpFetcher {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ProviderResult<Vec<u8>>> {
        Box::pin(self.fetch(url))
    }
}

/// Maps the status to an error or reads the body.
async fn handle_response(url: &str, response: Response) -> ProviderResult<Vec<u8>> {
    let status = response.status();
    debug!(url = %url, status = %status, "Received response");

    match status {
        s if s.is_success() => response
            .bytes()
            .await
            .map(|body| body.to_vec())
            .map_err(|e| {
                ProviderError::invalid_response(format!("Failed to read response: {}", e))
                    .with_url(url)
            }),
        StatusCode::NOT_FOUND => Err(ProviderError::not_found("HTTP 404").with_url(url)),
        StatusCode::TOO_MANY_REQUESTS => {
            Err(ProviderError::rate_limited("HTTP 429").with_url(url))
        }
        s if s.is_server_error() => {
            Err(ProviderError::server(format!("HTTP {}", s.as_u16())).with_url(url))
        }
        s => Err(
            ProviderError::invalid_response(format!("Unexpected status {}", s.as_u16()))
                .with_url(url),
        ),
    }
}

/// [`Fetcher`] serving canned bodies keyed by exact URL.
///
/// Unknown URLs answer with a not-found error. Requested URLs are recorded in
/// order so callers can check which candidates were tried.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    responses: HashMap<String, Result<Vec<u8>, u16>>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    /// Creates an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` for `url`.
    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(url.into(), Ok(body.into()));
        self
    }

    /// Answers `url` with an HTTP error status.
    pub fn with_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.responses.insert(url.into(), Err(status));
        self
    }

    /// Returns the URLs requested so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl Fetcher for StaticFetcher {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ProviderResult<Vec<u8>>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        let result = match self.responses.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(404)) | None => Err(ProviderError::not_found("HTTP 404").with_url(url)),
            Some(Err(status)) if *status >= 500 => {
                Err(ProviderError::server(format!("HTTP {}", status)).with_url(url))
            }
            Some(Err(status)) => Err(ProviderError::invalid_response(format!(
                "Unexpected status {}",
                status
            ))
            .with_url(url)),
        };
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;

    #[test]
    fn marker_detection() {
        assert!(is_calendar_payload(b"BEGIN:VCALENDAR\r\nEND:VCALENDAR"));
        assert!(is_calendar_payload(b"\xEF\xBB\xBFBEGIN:VCALENDAR"));
        assert!(!is_calendar_payload(b"<html>BEGIN:VEVENT</html>"));
        assert!(!is_calendar_payload(b""));
    }

    #[test]
    fn default_config() {
        let config = HttpConfig::default();
        assert_eq!(config.user_agent, HttpConfig::DEFAULT_USER_AGENT);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_redirects, 10);
    }

    #[test]
    fn config_builder_methods() {
        let config = HttpConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("test-agent");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test-agent");
    }

    #[test]
    fn client_creation() {
        assert!(HttpFetcher::new(&HttpConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn static_fetcher_serves_and_records() {
        let fetcher = StaticFetcher::new()
            .with_body("https://a.example/", "hello")
            .with_status("https://b.example/", 503);

        assert_eq!(fetcher.get("https://a.example/").await.unwrap(), b"hello");

        let err = fetcher.get("https://b.example/").await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ServerError);

        let err = fetcher.get("https://c.example/").await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NotFound);

        assert_eq!(
            fetcher.requests(),
            vec![
                "https://a.example/",
                "https://b.example/",
                "https://c.example/"
            ]
        );
    }
}
