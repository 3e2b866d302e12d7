//! Error types for calendar acquisition.
//!
//! Transport failures (network, timeout, error status) are recovered at every
//! candidate fetch site; parse failures and the total acquisition failure are
//! surfaced to the caller.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Resource not found (404).
    NotFound,
    /// Rate limit exceeded - too many requests.
    RateLimited,
    /// Server returned an error (5xx status codes).
    ServerError,
    /// Any other non-success status, or an unreadable body.
    InvalidResponse,
    /// A payload that should be an iCalendar document is malformed.
    ParseError,
    /// No export was found and scraping was not allowed or not possible.
    NoExportAvailable,
    /// Configuration error - invalid URL, unknown time zone.
    ConfigurationError,
    /// Internal error - unexpected state, bug.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns true if this error comes from fetching a single URL.
    ///
    /// These are the failures that only disqualify one candidate.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::NetworkError
                | Self::NotFound
                | Self::RateLimited
                | Self::ServerError
                | Self::InvalidResponse
        )
    }

    /// Returns a human-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "network_error",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::ParseError => "parse_error",
            Self::NoExportAvailable => "no_export_available",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while acquiring or transforming a calendar.
#[derive(Debug, Error)]
pub struct ProviderError {
    /// The error code categorizing this error.
    code: ProviderErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The URL being fetched, if any.
    url: Option<String>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            url: None,
            source: None,
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates a calendar parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ParseError, message)
    }

    /// Creates the "no public export available" error.
    pub fn no_export(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NoExportAvailable, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Sets the URL this error relates to.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the URL, if set.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Returns true if this error only disqualifies one candidate URL.
    pub fn is_transport(&self) -> bool {
        self.code.is_transport()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref url) = self.url {
            write!(f, " ({})", url)?;
        }
        Ok(())
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_codes() {
        assert!(ProviderErrorCode::NetworkError.is_transport());
        assert!(ProviderErrorCode::NotFound.is_transport());
        assert!(ProviderErrorCode::ServerError.is_transport());
        assert!(!ProviderErrorCode::ParseError.is_transport());
        assert!(!ProviderErrorCode::NoExportAvailable.is_transport());
    }

    #[test]
    fn error_code_display() {
        assert_eq!(
            ProviderErrorCode::NoExportAvailable.as_str(),
            "no_export_available"
        );
        assert_eq!(ProviderErrorCode::ParseError.to_string(), "parse_error");
    }

    #[test]
    fn provider_error_with_url() {
        let err = ProviderError::not_found("HTTP 404").with_url("https://rapla.example.org/x");
        assert_eq!(err.code(), ProviderErrorCode::NotFound);
        assert_eq!(err.url(), Some("https://rapla.example.org/x"));
        assert!(err.is_transport());
        assert_eq!(
            err.to_string(),
            "not_found: HTTP 404 (https://rapla.example.org/x)"
        );
    }

    #[test]
    fn provider_error_with_source() {
        use std::error::Error;
        let io_err = std::io::Error::other("connection reset");
        let err = ProviderError::network("request failed").with_source(io_err);
        assert!(err.source().is_some());
    }
}
