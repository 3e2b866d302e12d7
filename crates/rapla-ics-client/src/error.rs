//! Client error types.

use rapla_ics_providers::ProviderError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Acquisition or filtering failed.
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = ClientError::Config("no source URL".to_string());
        assert_eq!(err.to_string(), "configuration error: no source URL");

        let err: ClientError = ProviderError::no_export("No public iCal export available").into();
        assert!(err.to_string().contains("No public iCal export available"));

        let err: ClientError = std::io::Error::other("disk full").into();
        assert_eq!(err.to_string(), "IO error: disk full");
    }
}
